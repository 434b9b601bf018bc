//! Live list streams built on top of raw snapshot listeners.

use futures::future;
use futures::stream::{self, BoxStream, StreamExt};
use gotravel_core::error::{CoreError, DecodeError, RemoteError};
use gotravel_core::model::travel_plan::merge_by_id;
use gotravel_core::model::TravelPlan;

use crate::codec::{self, fields};
use crate::database::SnapshotStream;
use crate::value::Document;

/// A live, fully re-delivered entity list.
pub type EntityStream<T> = BoxStream<'static, Result<Vec<T>, CoreError>>;

/// Decode every snapshot of a single listener.
pub fn decode_snapshots<T: Send + 'static>(
    snapshots: SnapshotStream,
    decode: fn(&Document) -> Result<T, DecodeError>,
    sort: fn(&mut [T]),
) -> EntityStream<T> {
    snapshots
        .map(move |snapshot| -> Result<Vec<T>, CoreError> {
            let mut entities = codec::decode_all(&snapshot?, decode);
            sort(&mut entities);
            Ok(entities)
        })
        .boxed()
}

enum Side {
    Own(Result<Vec<Document>, RemoteError>),
    Shared(Result<Vec<Document>, RemoteError>),
}

/// Combine the owned-plans listener with the shared-with-me listener.
///
/// Nothing is emitted until both sides have delivered once; after that
/// every update from either side re-emits the merged list. A shared
/// listener rejected for a missing `sharedWith` field counts as an empty
/// shared list.
pub fn merge_own_and_shared(own: SnapshotStream, shared: SnapshotStream) -> EntityStream<TravelPlan> {
    let mut own_latest: Option<Vec<TravelPlan>> = None;
    let mut shared_latest: Option<Vec<TravelPlan>> = None;

    stream::select(own.map(Side::Own), shared.map(Side::Shared))
        .filter_map(move |side| {
            let outcome = match side {
                Side::Own(Ok(docs)) => {
                    own_latest = Some(codec::decode_all(&docs, codec::decode_travel_plan));
                    None
                }
                Side::Shared(Ok(docs)) => {
                    shared_latest = Some(codec::decode_all(&docs, codec::decode_travel_plan));
                    None
                }
                Side::Shared(Err(e)) if e.is_unknown_field(fields::SHARED_WITH) => {
                    tracing::debug!("Schema has no sharedWith field yet; no shared plans");
                    shared_latest.get_or_insert_with(Vec::new);
                    None
                }
                Side::Own(Err(e)) | Side::Shared(Err(e)) => Some(Err(CoreError::from(e))),
            };

            let emitted = outcome.or_else(|| match (&own_latest, &shared_latest) {
                (Some(own), Some(shared)) => {
                    let mut merged = merge_by_id(own.clone(), shared.clone());
                    sort_travel_plans(&mut merged);
                    Some(Ok(merged))
                }
                _ => None,
            });
            future::ready(emitted)
        })
        .boxed()
}

pub(crate) fn sort_travel_plans(plans: &mut [TravelPlan]) {
    plans.sort_by_key(|p| p.start_date);
}
