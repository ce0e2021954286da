use crate::error::ProtocolError;

/// Discriminator for the nine file operations this protocol carries.
///
/// Any value received on the wire that doesn't match one of these is a
/// [`ProtocolError::UnknownOpcode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Opcode {
    Open = 0,
    Close = 1,
    Read = 2,
    Write = 3,
    DirTree = 4,
    Unlink = 5,
    Lseek = 6,
    Stat = 7,
    GetEntry = 8,
}

impl Opcode {
    pub const fn as_u32(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for Opcode {
    type Error = ProtocolError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Open),
            1 => Ok(Self::Close),
            2 => Ok(Self::Read),
            3 => Ok(Self::Write),
            4 => Ok(Self::DirTree),
            5 => Ok(Self::Unlink),
            6 => Ok(Self::Lseek),
            7 => Ok(Self::Stat),
            8 => Ok(Self::GetEntry),
            other => Err(ProtocolError::UnknownOpcode(other)),
        }
    }
}
