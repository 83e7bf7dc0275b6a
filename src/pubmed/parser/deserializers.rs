//! Custom serde deserializers for PubMed XML fields

use serde::{Deserialize, Deserializer};
use std::fmt;
use std::result;

/// All text inside an element, with attributes dropped and child elements
/// flattened in document order.
///
/// Titles and abstracts occasionally carry markup that survives inline-tag
/// stripping (MathML, `<DispFormula>`); reading them as a plain `String` would
/// reject the whole record.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(super) struct TextContent(pub String);

impl TextContent {
    /// Content with runs of whitespace collapsed to single spaces
    pub fn normalized(&self) -> String {
        self.0.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

impl<'de> Deserialize<'de> for TextContent {
    fn deserialize<D>(deserializer: D) -> result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{self, IgnoredAny, MapAccess, Visitor};

        struct TextContentVisitor;

        impl<'de> Visitor<'de> for TextContentVisitor {
            type Value = TextContent;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("element text content")
            }

            fn visit_str<E>(self, value: &str) -> result::Result<TextContent, E>
            where
                E: de::Error,
            {
                Ok(TextContent(value.to_string()))
            }

            fn visit_string<E>(self, value: String) -> result::Result<TextContent, E>
            where
                E: de::Error,
            {
                Ok(TextContent(value))
            }

            fn visit_unit<E>(self) -> result::Result<TextContent, E>
            where
                E: de::Error,
            {
                Ok(TextContent::default())
            }

            fn visit_map<M>(self, mut map: M) -> result::Result<TextContent, M::Error>
            where
                M: MapAccess<'de>,
            {
                let mut parts = Vec::new();
                while let Some(key) = map.next_key::<String>()? {
                    if key.starts_with('@') {
                        let _: IgnoredAny = map.next_value()?;
                    } else {
                        // `$text`, `$value` or a nested element
                        let value: TextContent = map.next_value()?;
                        parts.push(value.0);
                    }
                }
                Ok(TextContent(parts.join(" ")))
            }
        }

        deserializer.deserialize_any(TextContentVisitor)
    }
}

/// Deserialize a boolean from "Y"/"N" attribute values such as `MajorTopicYN`.
///
/// Only "Y" is true; a missing attribute is false.
pub(super) fn deserialize_bool_yn<'de, D>(deserializer: D) -> result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    Ok(s.is_some_and(|s| s.trim() == "Y"))
}
