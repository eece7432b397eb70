use core::fmt;
use core::hash::Hash;

mod sealed {
    pub trait Sealed {}
}

/// Marker trait for the mapping sizes of the 4 KiB translation granule.
///
/// Each size corresponds to the table level at which a walk terminates:
/// a page descriptor at level 3, or a block descriptor at level 2 or 1.
pub trait PageSize:
    sealed::Sealed + Clone + Copy + Eq + PartialEq + Ord + PartialOrd + Hash + fmt::Display + fmt::Debug
{
    /// log2 of the mapping size: the number of low input-address bits that
    /// pass through to the output address unchanged.
    const SHIFT: u32;
    /// Mapping size in bytes.
    const SIZE: u64 = 1 << Self::SHIFT;

    /// Short label, e.g. `"2M"`.
    fn as_str() -> &'static str;
}

macro_rules! mapping_size {
    ($(#[$doc:meta] $name:ident => $shift:literal, $label:literal;)*) => {
        $(
            #[$doc]
            #[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
            pub struct $name;

            impl sealed::Sealed for $name {}

            impl PageSize for $name {
                const SHIFT: u32 = $shift;

                #[inline]
                fn as_str() -> &'static str {
                    $label
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str($label)
                }
            }

            impl fmt::Debug for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}({})", stringify!($name), $label)
                }
            }
        )*
    };
}

mapping_size! {
    /// 4 KiB page, mapped by a level-3 page descriptor.
    Size4K => 12, "4K";
    /// 2 MiB block, mapped by a level-2 block descriptor.
    Size2M => 21, "2M";
    /// 1 GiB block, mapped by a level-1 block descriptor.
    Size1G => 30, "1G";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Level;

    #[test]
    fn shifts_match_levels() {
        assert_eq!(Size4K::SHIFT, Level::L3.shift());
        assert_eq!(Size2M::SHIFT, Level::L2.shift());
        assert_eq!(Size1G::SHIFT, Level::L1.shift());
    }

    #[test]
    fn sizes() {
        assert_eq!(Size4K::SIZE, 4096);
        assert_eq!(Size2M::SIZE, 2 * 1024 * 1024);
        assert_eq!(Size1G::SIZE, 1024 * 1024 * 1024);
        assert_eq!(Size2M.to_string(), "2M");
    }
}
