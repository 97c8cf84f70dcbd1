/// Marker component for the shared frame of reference.
///
/// Every pose exchanged with other participants is expressed relative to the entity carrying this
/// component, never relative to the world. Move the stage to move everyone's heads with it.
#[derive(Debug)]
pub struct Stage;
