use std::fmt;

/// Displays bytes as a comma-separated list of hex values.
///
/// ```
/// use kbox_frame::HexDump;
/// assert_eq!(HexDump(&[0x0f, 0x00, 0xc0]).to_string(), "0x0f, 0x00, 0xc0");
/// ```
#[derive(Clone, Copy)]
pub struct HexDump<'a>(pub &'a [u8]);

impl fmt::Display for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "0x{b:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{self}]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_dump() {
        assert_eq!(HexDump(&[]).to_string(), "");
        assert_eq!(format!("{:?}", HexDump(&[])), "[]");
    }

    #[test]
    fn debug_wraps_in_brackets() {
        assert_eq!(format!("{:?}", HexDump(&[0xdb, 0x01])), "[0xdb, 0x01]");
    }
}
