use std::{fmt, marker::PhantomData};

use serde::{
    de::{IgnoredAny, MapAccess, SeqAccess, Visitor},
    ser::SerializeMap,
    Deserialize, Deserializer, Serialize, Serializer,
};

/// A JSON object whose entries keep the order they had in the payload.
///
/// The upstream sends an empty array instead of `{}` when an object has no
/// entries, so an empty sequence is accepted as an empty map.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderedMap<T>(Vec<(String, T)>);

impl<T> OrderedMap<T> {
    pub fn iter(&self) -> impl Iterator<Item = (&String, &T)> {
        self.0.iter().map(|(key, value)| (key, value))
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.0.iter().map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T> Default for OrderedMap<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> FromIterator<(String, T)> for OrderedMap<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<T: Serialize> Serialize for OrderedMap<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for OrderedMap<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedMapVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<T> {
            type Value = OrderedMap<T>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an object or an empty array")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, value)) = access.next_entry::<String, T>()? {
                    entries.push((key, value));
                }

                Ok(OrderedMap(entries))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                if access.next_element::<IgnoredAny>()?.is_some() {
                    return Err(serde::de::Error::custom(
                        "expected an object, found a non-empty array",
                    ));
                }

                Ok(OrderedMap::default())
            }

            fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
                Ok(OrderedMap::default())
            }
        }

        deserializer.deserialize_any(OrderedMapVisitor(PhantomData))
    }
}

/// Translations of a string keyed by language code, e.g. `{"en": "...", "ja-ro": "..."}`.
pub type LocalizedString = OrderedMap<String>;

impl LocalizedString {
    /// First non-empty value among `preferred` languages, else the first non-empty value.
    pub fn pick(&self, preferred: &[&str]) -> Option<&str> {
        preferred
            .iter()
            .filter_map(|lang| self.get(lang))
            .chain(self.values())
            .map(String::as_str)
            .find(|value| !value.is_empty())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct AggregateDocument {
    #[serde(default)]
    pub result: String,
    #[serde(default)]
    pub volumes: OrderedMap<VolumeBucket>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct VolumeBucket {
    #[serde(default)]
    pub volume: Option<String>,
    #[serde(default)]
    pub count: u32,
    // entries are validated one by one so a single bad record doesn't sink the document
    #[serde(default)]
    pub chapters: OrderedMap<serde_json::Value>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AggregateChapter {
    #[serde(default)]
    pub chapter: Option<String>,
    pub id: String,
    #[serde(default)]
    pub others: Vec<String>,
    #[serde(default)]
    pub count: u32,
}

#[derive(Deserialize, Debug)]
pub struct Collection<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub total: usize,
}

#[derive(Deserialize, Debug)]
pub struct Entity<T> {
    pub data: T,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct Relationship {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub related: Option<String>,
}

pub trait HasRelationships {
    fn relationships(&self) -> &[Relationship];

    fn relationship(&self, kind: &str) -> Option<&Relationship> {
        self.relationships().iter().find(|rel| rel.kind == kind)
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct MangaData {
    pub id: String,
    pub attributes: MangaAttributes,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

#[derive(Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct MangaAttributes {
    #[serde(default)]
    pub title: LocalizedString,
    #[serde(default)]
    pub description: LocalizedString,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub last_chapter: Option<String>,
}

impl HasRelationships for MangaData {
    fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct CoverData {
    pub id: String,
    pub attributes: CoverAttributes,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CoverAttributes {
    pub file_name: String,
    #[serde(default)]
    pub volume: Option<String>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ChapterData {
    pub id: String,
    pub attributes: ChapterAttributes,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

#[derive(Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChapterAttributes {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub volume: Option<String>,
    #[serde(default)]
    pub chapter: Option<String>,
    #[serde(default)]
    pub pages: u32,
    #[serde(default)]
    pub translated_language: Option<String>,
}

impl HasRelationships for ChapterData {
    fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AtHomeServer {
    pub base_url: String,
    pub chapter: AtHomeChapter,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AtHomeChapter {
    pub hash: String,
    #[serde(default)]
    pub data: Vec<String>,
    #[serde(default)]
    pub data_saver: Vec<String>,
}
