/// Marker trait for values that travel through the hub.
///
/// Produced items and dispatch signals must be `Send + Sync + 'static`
/// because they:
/// - Are shared as `Arc<P>` across every client that receives them (Sync)
/// - Cross task boundaries and live in spawned bursts (Send, 'static)
///
/// Items are never cloned by the hub, so `Clone` is not required. The trait
/// is implemented automatically for every qualifying type.
pub trait Payload: Send + Sync + 'static {}

impl<T: Send + Sync + 'static> Payload for T {}
