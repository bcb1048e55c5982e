//! Turns raw directory listings into the ordered set of shader identifiers the
//! viewer navigates through.
//!
//! Two listing formats are understood:
//!
//! - HTML directory indexes as produced by `python -m http.server`, nginx
//!   `autoindex` or Apache `mod_autoindex`; every anchor whose `href` ends in
//!   [`SHADER_EXTENSION`] is a shader.
//! - JSON manifests, either a bare array of file names or an object with a
//!   `shaders` array.
//!
//! Whatever the source, [`normalize_listing`] drops parent-directory and
//! non-shader entries, sorts lexicographically and removes duplicates (fancy
//! indexes link every file twice, once through its icon).
use std::fmt;

use serde::Deserialize;

use crate::provider::CatalogError;

/// File extension every gallery fragment shader carries.
pub const SHADER_EXTENSION: &str = ".glsl";

/// Name of a fragment shader, unique within one listing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShaderId(String);

impl ShaderId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name without leading directories.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// File name with the shader extension removed, as shown in locations.
    pub fn stem(&self) -> &str {
        strip_extension(self.file_name())
    }

    /// Case-insensitive comparison against a route segment. The extension is
    /// ignored on both sides.
    pub fn matches_route(&self, route: &str) -> bool {
        let wanted = strip_extension(route.trim_matches('/'));
        !wanted.is_empty() && self.stem().to_lowercase() == wanted.to_lowercase()
    }
}

impl fmt::Display for ShaderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Removes a trailing `.glsl` regardless of its case.
pub fn strip_extension(name: &str) -> &str {
    let Some(cut) = name.len().checked_sub(SHADER_EXTENSION.len()) else {
        return name;
    };
    if name.is_char_boundary(cut) && name[cut..].eq_ignore_ascii_case(SHADER_EXTENSION) {
        &name[..cut]
    } else {
        name
    }
}

fn is_shader_entry(entry: &str) -> bool {
    !entry.is_empty()
        && entry != "../"
        && !entry.starts_with("../")
        && !entry.starts_with('?')
        && !entry.starts_with('#')
        && entry.ends_with(SHADER_EXTENSION)
}

/// Filters, sorts and de-duplicates raw listing entries.
pub fn normalize_listing<I, S>(entries: I) -> Vec<ShaderId>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut names: Vec<String> = entries
        .into_iter()
        .map(|entry| {
            let entry = entry.as_ref().trim();
            entry.strip_prefix("./").unwrap_or(entry).to_string()
        })
        .filter(|entry| is_shader_entry(entry))
        .collect();
    names.sort();
    names.dedup();
    names.into_iter().map(ShaderId).collect()
}

/// Extracts shader identifiers from an HTML directory index.
pub fn parse_directory_index(html: &str) -> Vec<ShaderId> {
    normalize_listing(anchor_hrefs(html))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ManifestDocument {
    List(Vec<String>),
    Object { shaders: Vec<String> },
}

/// Extracts shader identifiers from a JSON manifest.
pub fn parse_manifest(json: &str) -> Result<Vec<ShaderId>, CatalogError> {
    let document: ManifestDocument = serde_json::from_str(json)?;
    let entries = match document {
        ManifestDocument::List(entries) => entries,
        ManifestDocument::Object { shaders } => shaders,
    };
    Ok(normalize_listing(entries))
}

/// Collects the `href` attribute of every `<a>` tag, in document order.
fn anchor_hrefs(html: &str) -> Vec<String> {
    // ASCII lowercasing keeps byte offsets aligned with the original text.
    let lowered = html.to_ascii_lowercase();
    let mut hrefs = Vec::new();
    let mut cursor = 0;

    while let Some(found) = lowered[cursor..].find("<a") {
        let tag_start = cursor + found;
        let after_name = tag_start + 2;
        cursor = after_name;

        let is_anchor = lowered[after_name..]
            .chars()
            .next()
            .is_some_and(|ch| ch.is_ascii_whitespace());
        if !is_anchor {
            continue;
        }
        let Some(tag_len) = lowered[after_name..].find('>') else {
            break;
        };
        let tag_end = after_name + tag_len;
        let tag = &html[after_name..tag_end];
        if let Some(value) = attribute_value(tag, &lowered[after_name..tag_end], "href") {
            hrefs.push(decode_entities(value));
        }
        cursor = tag_end;
    }

    hrefs
}

fn attribute_value<'a>(tag: &'a str, lowered: &str, name: &str) -> Option<&'a str> {
    let mut search_from = 0;
    while let Some(found) = lowered[search_from..].find(name) {
        let start = search_from + found;
        search_from = start + name.len();

        let preceded_by_space = lowered[..start]
            .chars()
            .next_back()
            .map_or(true, |ch| ch.is_ascii_whitespace());
        if !preceded_by_space {
            continue;
        }

        let rest = lowered[search_from..].trim_start();
        let Some(after_eq) = rest.strip_prefix('=') else {
            continue;
        };
        let value_start = lowered.len() - after_eq.trim_start().len();
        let raw = &tag[value_start..];
        return match raw.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let body = &raw[1..];
                Some(body.find(quote).map_or(body, |end| &body[..end]))
            }
            Some(_) => {
                let end = raw
                    .find(|ch: char| ch.is_ascii_whitespace())
                    .unwrap_or(raw.len());
                Some(&raw[..end])
            }
            None => None,
        };
    }
    None
}

fn decode_entities(value: &str) -> String {
    value
        .replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_listing_entries() {
        let listing = normalize_listing(["shaderB.glsl", "shaderA.glsl"]);
        assert_eq!(
            listing,
            vec![ShaderId::new("shaderA.glsl"), ShaderId::new("shaderB.glsl")]
        );
    }

    #[test]
    fn parses_python_http_server_index() {
        let html = r#"<!DOCTYPE HTML>
<html lang="en">
<head><title>Directory listing for /frag/</title></head>
<body>
<h1>Directory listing for /frag/</h1>
<hr>
<ul>
<li><a href="../">../</a></li>
<li><a href="waves.glsl">waves.glsl</a></li>
<li><a href="README.md">README.md</a></li>
<li><a href="Plasma.glsl">Plasma.glsl</a></li>
<li><a href="notes/">notes/</a></li>
</ul>
</body>
</html>"#;
        let listing = parse_directory_index(html);
        assert_eq!(
            listing,
            vec![ShaderId::new("Plasma.glsl"), ShaderId::new("waves.glsl")]
        );
    }

    #[test]
    fn parses_apache_fancy_index_without_duplicates() {
        let html = r#"<table>
<tr><th><a href="?C=N;O=D">Name</a></th></tr>
<tr><td><a href="/">Parent Directory</a></td></tr>
<tr><td><a href="tunnel.glsl"><img src="/icons/text.gif"></a></td>
<td><A HREF='tunnel.glsl'>tunnel.glsl</A></td></tr>
<tr><td><a class="file" href=rings.glsl>rings.glsl</a></td></tr>
<tr><td><abbr title="x">a</abbr><a data-href="fake.glsl" href="x&amp;y.glsl">x&amp;y.glsl</a></td></tr>
</table>"#;
        let listing = parse_directory_index(html);
        assert_eq!(
            listing,
            vec![
                ShaderId::new("rings.glsl"),
                ShaderId::new("tunnel.glsl"),
                ShaderId::new("x&y.glsl"),
            ]
        );
    }

    #[test]
    fn excludes_parent_links_pointing_at_shaders() {
        let listing = normalize_listing(["../escape.glsl", "./local.glsl", "other.frag"]);
        assert_eq!(listing, vec![ShaderId::new("local.glsl")]);
    }

    #[test]
    fn parses_manifest_array_and_object() {
        let array = parse_manifest(r#"["b.glsl", "a.glsl", "vertexShader.txt"]"#).unwrap();
        assert_eq!(array, vec![ShaderId::new("a.glsl"), ShaderId::new("b.glsl")]);

        let object = parse_manifest(r#"{"shaders": ["z.glsl", "m.glsl"]}"#).unwrap();
        assert_eq!(object, vec![ShaderId::new("m.glsl"), ShaderId::new("z.glsl")]);
    }

    #[test]
    fn rejects_malformed_manifest() {
        assert!(matches!(
            parse_manifest("{\"files\": 3}"),
            Err(CatalogError::Manifest(_))
        ));
    }

    #[test]
    fn route_matching_ignores_case_and_extension() {
        let id = ShaderId::new("PlasmaWaves.glsl");
        assert_eq!(id.stem(), "PlasmaWaves");
        assert!(id.matches_route("plasmawaves"));
        assert!(id.matches_route("/PLASMAWAVES"));
        assert!(id.matches_route("plasmawaves.GLSL"));
        assert!(!id.matches_route("plasma"));
        assert!(!id.matches_route(""));
    }

    #[test]
    fn strips_extension_case_insensitively() {
        assert_eq!(strip_extension("a.GLSL"), "a");
        assert_eq!(strip_extension("glsl"), "glsl");
        assert_eq!(strip_extension("a.frag"), "a.frag");
    }
}
