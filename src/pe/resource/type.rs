/// Well-known `RT_*` resource type IDs.
///
/// Inno Setup stores its setup loader offset table as `RCDATA` resource 11111, nested under the
/// standard `RT_RCDATA` type directory.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResourceType {
    RCData,
}

impl ResourceType {
    #[must_use]
    pub const fn id(self) -> u32 {
        match self {
            Self::RCData => 10,
        }
    }
}
