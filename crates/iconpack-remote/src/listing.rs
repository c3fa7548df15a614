use crate::RemoteError;
use serde::{Deserialize, Serialize};

/// Paging and ordering parameters for one listing call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub project_id: String,
    pub page: u32,
    pub per_page: u32,
    pub sort: String,
}

impl ListQuery {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            page: 1,
            per_page: 100,
            sort: "-iconId".to_owned(),
        }
    }

    /// JSON body the icon service expects on its listing endpoint.
    pub fn request_body(&self) -> serde_json::Value {
        serde_json::json!({
            "params": {
                "page": self.page,
                "perPage": self.per_page,
                "sort": self.sort,
            }
        })
    }
}

/// One icon with its renderings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconRecord {
    #[serde(rename = "iconImages", default, deserialize_with = "null_as_empty")]
    pub images: Vec<IconImage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconImage {
    #[serde(rename = "imageName")]
    pub name: String,
    #[serde(rename = "iconImagePath")]
    pub path: String,
}

impl IconImage {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parse a listing response body.
///
/// Anything other than an array at `result.icons` means zero icons, as does a
/// missing or null `iconImages`. A body that is not JSON, or whose images lack
/// a name or path, is an error.
pub fn parse_listing(body: &str) -> Result<Vec<IconRecord>, RemoteError> {
    let invalid =
        |e: serde_json::Error| RemoteError::Serialization(format!("invalid icon listing: {e}"));
    let value: serde_json::Value = serde_json::from_str(body).map_err(invalid)?;
    let Some(icons) = value
        .get("result")
        .and_then(|r| r.get("icons"))
        .and_then(serde_json::Value::as_array)
    else {
        return Ok(Vec::new());
    };
    icons
        .iter()
        .map(|icon| IconRecord::deserialize(icon).map_err(invalid))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_shape() {
        let q = ListQuery::new("42");
        assert_eq!(
            q.request_body(),
            serde_json::json!({"params": {"page": 1, "perPage": 100, "sort": "-iconId"}})
        );
    }

    #[test]
    fn parses_icons_and_images_in_order() {
        let body = r#"{"result":{"icons":[
            {"iconImages":[{"imageName":"a.svg","iconImagePath":"img/a.svg"},
                           {"imageName":"a-bold.svg","iconImagePath":"img/a-bold.svg"}]},
            {"iconImages":[{"imageName":"b.svg","iconImagePath":"img/b.svg","extra":1}]}
        ]},"status":"ok"}"#;
        let icons = parse_listing(body).unwrap();
        assert_eq!(icons.len(), 2);
        assert_eq!(icons[0].images[1], IconImage::new("a-bold.svg", "img/a-bold.svg"));
        assert_eq!(icons[1].images[0].path, "img/b.svg");
    }

    #[test]
    fn missing_shape_means_zero_icons() {
        for body in [
            "{}",
            r#"{"result":null}"#,
            r#"{"result":{}}"#,
            r#"{"result":{"icons":null}}"#,
            r#"{"result":[]}"#,
            r#"{"result":"none"}"#,
            r#"{"result":{"icons":{}}}"#,
            r#"{"result":{"icons":"none"}}"#,
            "[]",
            "null",
        ] {
            assert!(parse_listing(body).unwrap().is_empty(), "{body}");
        }
        let icons = parse_listing(r#"{"result":{"icons":[{}, {"iconImages":null}]}}"#).unwrap();
        assert_eq!(icons.len(), 2);
        assert!(icons.iter().all(|i| i.images.is_empty()));
    }

    #[test]
    fn non_json_body_is_an_error() {
        assert!(matches!(
            parse_listing("<html>502 Bad Gateway</html>"),
            Err(RemoteError::Serialization(_))
        ));
    }

    #[test]
    fn image_without_path_is_an_error() {
        let body = r#"{"result":{"icons":[{"iconImages":[{"imageName":"a.svg"}]}]}}"#;
        assert!(parse_listing(body).is_err());
    }
}
