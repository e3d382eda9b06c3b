use crate::models::Category;

pub const PALETTE: [&str; 10] = [
    "#3B82F6", "#10B981", "#F59E0B", "#EF4444", "#8B5CF6", "#EC4899", "#06B6D4", "#6366F1",
    "#F97316", "#14B8A6",
];

/// Shown for category names with no matching category.
pub const FALLBACK_COLOR: &str = "#94A3B8";

/// Color for the n-th category ever created. Wraps once the palette runs out.
pub fn palette_color(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()]
}

/// Exact, case-sensitive lookup.
pub fn color_of<'a>(categories: &'a [Category], name: &str) -> &'a str {
    categories
        .iter()
        .find(|c| c.name == name)
        .map(|c| c.color.as_str())
        .unwrap_or(FALLBACK_COLOR)
}

/// Parse `#RRGGBB` into components for terminal swatches.
pub fn rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TxnType;

    fn category(name: &str, color: &str) -> Category {
        Category {
            id: 1,
            name: name.to_string(),
            kind: TxnType::Expense,
            sub_category: None,
            notes: None,
            color: color.to_string(),
        }
    }

    #[test]
    fn test_palette_cycles() {
        assert_eq!(palette_color(0), "#3B82F6");
        assert_eq!(palette_color(9), "#14B8A6");
        assert_eq!(palette_color(10), palette_color(0));
        assert_eq!(palette_color(23), palette_color(3));
    }

    #[test]
    fn test_color_lookup_is_case_sensitive() {
        let cats = vec![category("Food", "#F59E0B")];
        assert_eq!(color_of(&cats, "Food"), "#F59E0B");
        assert_eq!(color_of(&cats, "food"), FALLBACK_COLOR);
        assert_eq!(color_of(&[], "Travel"), FALLBACK_COLOR);
    }

    #[test]
    fn test_rgb() {
        assert_eq!(rgb("#10B981"), Some((0x10, 0xB9, 0x81)));
        assert_eq!(rgb("10B981"), None);
        assert_eq!(rgb("#XYZ123"), None);
    }
}
