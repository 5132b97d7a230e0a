use crate::consts::BYTES_PER_LENGTH_OFFSET;

/// Serialized size of an SSZ type.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Size {
    Fixed { size: usize },
    Variable { minimum_size: usize },
}

impl Size {
    /// Size the value occupies in the fixed part of its enclosing container.
    #[inline]
    #[must_use]
    pub const fn fixed_part(self) -> usize {
        match self {
            Self::Fixed { size } => size,
            Self::Variable { .. } => BYTES_PER_LENGTH_OFFSET,
        }
    }

    /// Exact size of a fixed-size type.
    ///
    /// Panics when called on a variable-size type.
    /// This is only intended for use in `const` expressions, where the panic
    /// turns into a compilation error.
    #[inline]
    #[must_use]
    pub const fn get(self) -> usize {
        match self {
            Self::Fixed { size } => size,
            Self::Variable { .. } => panic!("Size::get called on a variable size"),
        }
    }

    #[must_use]
    pub const fn mul(self, factor: usize) -> Self {
        match self {
            Self::Fixed { size } => Self::Fixed {
                size: size * factor,
            },
            Self::Variable { minimum_size } => Self::Variable {
                minimum_size: (minimum_size + BYTES_PER_LENGTH_OFFSET) * factor,
            },
        }
    }

    /// Size of a container with fields of the given sizes.
    #[must_use]
    pub const fn for_container<const FIELDS: usize>(field_sizes: [Self; FIELDS]) -> Self {
        let mut fixed = true;
        let mut total = 0;

        let mut position = 0;
        while position < FIELDS {
            match field_sizes[position] {
                Self::Fixed { size } => total += size,
                Self::Variable { minimum_size } => {
                    fixed = false;
                    total += BYTES_PER_LENGTH_OFFSET + minimum_size;
                }
            }
            position += 1;
        }

        if fixed {
            Self::Fixed { size: total }
        } else {
            Self::Variable {
                minimum_size: total,
            }
        }
    }

    /// Size of an untagged union, i.e. the minimum over all variants.
    #[must_use]
    pub const fn for_untagged_union<const VARIANTS: usize>(
        variant_sizes: [Self; VARIANTS],
    ) -> Self {
        let mut minimum = usize::MAX;

        let mut position = 0;
        while position < VARIANTS {
            let variant_minimum = match variant_sizes[position] {
                Self::Fixed { size } => size,
                Self::Variable { minimum_size } => minimum_size,
            };

            if variant_minimum < minimum {
                minimum = variant_minimum;
            }

            position += 1;
        }

        Self::Variable {
            minimum_size: minimum,
        }
    }
}
