//! Helpers to parse packed binary structs with a byte order
//! known only at runtime.

use std::io::Read;

use anyhow::Result;
use byteordered::{ByteOrdered, Endian};

pub(crate) trait Parseable: Sized {
    fn parse<R: Read, E: Endian>(r: &mut ByteOrdered<R, E>) -> Result<Self>;
}

/// Declare a struct whose fields are read in order by
/// [`Parseable::parse`]. Parse errors name the failing
/// field.
macro_rules! parseable_struct {
    (
        $(#[$smeta:meta])*
        $svis:vis struct $sname:ident {
            $($fvis:vis $name:ident : $ty:ty),* $(,)?
        }
    ) => {
        $(#[$smeta])*
        #[allow(dead_code)]
        $svis struct $sname {
            $($fvis $name: $ty),*
        }

        impl crate::parse::Parseable for $sname {
            fn parse<R: std::io::Read, E: byteordered::Endian>(
                r: &mut byteordered::ByteOrdered<R, E>,
            ) -> anyhow::Result<Self> {
                $(
                    let $name = anyhow::Context::with_context(
                        <$ty as crate::parse::Parseable>::parse(r),
                        || format!("parsing field `{}.{}`", stringify!($sname), stringify!($name)),
                    )?;
                )*
                Ok($sname { $($name),* })
            }
        }
    };
}

macro_rules! impl_parseable {
    ($($ty:ty => $method:ident),* $(,)?) => {
        $(
            impl Parseable for $ty {
                fn parse<R: Read, E: Endian>(r: &mut ByteOrdered<R, E>) -> Result<Self> {
                    Ok(r.$method()?)
                }
            }
        )*
    };
}

impl_parseable! {
    u8 => read_u8,
    u16 => read_u16,
    i16 => read_i16,
    u32 => read_u32,
    i32 => read_i32,
    f32 => read_f32,
    f64 => read_f64,
}

impl<T, const N: usize> Parseable for [T; N]
where
    T: Parseable + Default + Copy,
{
    fn parse<R: Read, E: Endian>(r: &mut ByteOrdered<R, E>) -> Result<Self> {
        let mut out = [T::default(); N];
        for item in out.iter_mut() {
            *item = T::parse(r)?;
        }
        Ok(out)
    }
}
