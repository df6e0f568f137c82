//! Display labels for raw insight field identifiers.

const FIELD_DISPLAY_NAMES: &[(&str, &str)] = &[
    ("like", "Likes"),
    ("link_click", "Link clicks"),
    ("post_like", "Post Likes"),
    ("comment", "Comments"),
    ("mobile_app_install", "Mobile App Installations"),
    ("call_to_action_clicks", "CTA Clicks"),
    ("ctr", "CTR"),
    ("canvas_avg_view_percent", "Avg % canvas viewed"),
    ("impressions", "Impressions"),
    ("social_clicks", "Social Clicks"),
    ("website_clicks", "Website Clicks"),
];

/// Human label for `field`; fields without one are their own label.
pub fn display_name(field: &str) -> &str {
    FIELD_DISPLAY_NAMES
        .iter()
        .find(|(raw, _)| *raw == field)
        .map(|(_, label)| *label)
        .unwrap_or(field)
}

/// Every mapped field, in table order.
pub fn known_fields() -> impl Iterator<Item = (&'static str, &'static str)> {
    FIELD_DISPLAY_NAMES.iter().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapped_fields() {
        assert_eq!(display_name("ctr"), "CTR");
        assert_eq!(display_name("like"), "Likes");
        assert_eq!(display_name("link_click"), "Link clicks");
        for (raw, label) in known_fields() {
            assert_eq!(display_name(raw), label);
        }
    }

    #[test]
    fn test_unmapped_fields_pass_through() {
        assert_eq!(display_name("reach"), "reach");
        assert_eq!(display_name(""), "");
        assert_eq!(display_name("CTR"), "CTR");
    }
}
