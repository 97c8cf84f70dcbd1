/// Component that adds some information about the entity
/// Useful for debugging - added to every placeholder
#[derive(Debug, Clone, Eq, PartialEq, Hash, Default)]
pub struct Info {
    /// A helpful name
    pub name: String,
}
