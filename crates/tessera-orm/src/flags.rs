use bitflags::bitflags;

bitflags! {
    /// Schema-generation conventions applied when a mapping is built.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CreateFlags: u32 {
        /// A field named `Id` (any case) is the primary key.
        const IMPLICIT_PK = 0x01;
        /// Columns whose name ends in `Id` (any case) get a single-column index.
        const IMPLICIT_INDEX = 0x02;
        /// Both implicit conventions.
        const ALL_IMPLICIT = Self::IMPLICIT_PK.bits() | Self::IMPLICIT_INDEX.bits();
        /// Primary keys auto-increment unless they are UUIDs.
        const AUTO_INC_PK = 0x04;
    }
}

/// Name matched by [`CreateFlags::IMPLICIT_PK`] and suffix matched by
/// [`CreateFlags::IMPLICIT_INDEX`].
pub(crate) const IMPLICIT_KEY: &str = "Id";
