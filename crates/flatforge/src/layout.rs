// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Physical layout arithmetic shared by every type model.

/// One inline slot of a type: its byte size and required alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PhysicalLayoutElement {
    pub inline_size: usize,
    pub alignment: usize,
}

impl PhysicalLayoutElement {
    pub const fn new(inline_size: usize, alignment: usize) -> Self {
        Self {
            inline_size,
            alignment,
        }
    }

    /// Worst-case bytes this slot consumes at an arbitrary offset.
    pub const fn max_inline_size(&self) -> usize {
        self.inline_size + max_padding(self.alignment)
    }
}

/// Round `offset` up to the next multiple of `alignment`.
#[inline]
pub const fn align_to(offset: usize, alignment: usize) -> usize {
    if alignment <= 1 {
        return offset;
    }
    (offset + alignment - 1) & !(alignment - 1)
}

/// Bytes needed to bring `offset` to `alignment`.
#[inline]
pub const fn alignment_padding(offset: usize, alignment: usize) -> usize {
    align_to(offset, alignment) - offset
}

/// Largest padding an `alignment` can ever require.
#[inline]
pub const fn max_padding(alignment: usize) -> usize {
    alignment.saturating_sub(1)
}

/// Sum of worst-case sizes over a multi-slot layout.
pub fn max_inline_size(layout: &[PhysicalLayoutElement]) -> usize {
    layout
        .iter()
        .map(PhysicalLayoutElement::max_inline_size)
        .sum()
}

/// Largest alignment in a layout (1 when empty).
pub fn max_alignment(layout: &[PhysicalLayoutElement]) -> usize {
    layout.iter().map(|e| e.alignment).max().unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_to() {
        assert_eq!(align_to(0, 4), 0);
        assert_eq!(align_to(1, 4), 4);
        assert_eq!(align_to(4, 4), 4);
        assert_eq!(align_to(5, 8), 8);
        assert_eq!(align_to(7, 1), 7);
    }

    #[test]
    fn test_padding() {
        assert_eq!(alignment_padding(6, 4), 2);
        assert_eq!(alignment_padding(8, 8), 0);
        assert_eq!(max_padding(8), 7);
        assert_eq!(max_padding(1), 0);
    }

    #[test]
    fn test_union_layout_worst_case() {
        let layout = [
            PhysicalLayoutElement::new(1, 1),
            PhysicalLayoutElement::new(4, 4),
        ];
        assert_eq!(max_inline_size(&layout), 1 + 4 + 3);
        assert_eq!(max_alignment(&layout), 4);
    }
}
