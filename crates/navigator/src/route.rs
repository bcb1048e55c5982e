use catalog::ShaderId;

/// How the current shader is encoded in the reflected location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RouteStyle {
    /// `<origin>/<name>`
    #[default]
    Path,
    /// `<page>#<name>`
    Hash,
}

/// Extracts the route segment from a location or bare name.
///
/// Accepts full URLs (`http://host/waves`, `http://host/index.html#waves`),
/// absolute paths (`/waves`), fragments (`#waves`) and bare names. The result
/// is lowercased; an empty route yields `None`.
pub fn parse_route(input: &str, style: RouteStyle) -> Option<String> {
    let input = input.trim();
    let raw = match style {
        RouteStyle::Hash => match input.split_once('#') {
            Some((_, fragment)) => fragment,
            None if is_url(input) => "",
            None => input,
        },
        RouteStyle::Path => {
            let without_fragment = input.split('#').next().unwrap_or_default();
            let path = if is_url(without_fragment) {
                strip_origin(without_fragment)
            } else {
                without_fragment
            };
            path.split('?').next().unwrap_or_default()
        }
    };
    let route = raw.trim_matches('/').to_lowercase();
    (!route.is_empty()).then_some(route)
}

/// Base location the current shader name is written into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    base: String,
    style: RouteStyle,
}

impl Location {
    /// Path style keeps only the origin of `base`; hash style keeps the page
    /// without any existing fragment.
    pub fn new(base: &str, style: RouteStyle) -> Self {
        let base = base.trim();
        let base = match style {
            RouteStyle::Path if is_url(base) => origin(base),
            RouteStyle::Path => base,
            RouteStyle::Hash => base.split('#').next().unwrap_or_default(),
        };
        Self {
            base: base.trim_end_matches('/').to_string(),
            style,
        }
    }

    pub fn style(&self) -> RouteStyle {
        self.style
    }

    pub fn reflect(&self, id: &ShaderId) -> String {
        match self.style {
            RouteStyle::Path => format!("{}/{}", self.base, id.stem()),
            RouteStyle::Hash => format!("{}#{}", self.base, id.stem()),
        }
    }
}

fn is_url(input: &str) -> bool {
    input.contains("://")
}

fn origin(url: &str) -> &str {
    let path_len = strip_origin(url).len();
    &url[..url.len() - path_len]
}

fn strip_origin(url: &str) -> &str {
    let Some((_, after_scheme)) = url.split_once("://") else {
        return url;
    };
    match after_scheme.find('/') {
        Some(slash) => &after_scheme[slash..],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_routes() {
        assert_eq!(
            parse_route("http://localhost:8000/Waves", RouteStyle::Path).as_deref(),
            Some("waves")
        );
        assert_eq!(parse_route("/tunnel.glsl", RouteStyle::Path).as_deref(), Some("tunnel.glsl"));
        assert_eq!(parse_route("aurora?x=1", RouteStyle::Path).as_deref(), Some("aurora"));
        assert_eq!(parse_route("http://localhost:8000/", RouteStyle::Path), None);
        assert_eq!(parse_route("http://localhost:8000", RouteStyle::Path), None);
        assert_eq!(parse_route("/", RouteStyle::Path), None);
    }

    #[test]
    fn hash_routes() {
        assert_eq!(
            parse_route("http://host/index.html#Plasma", RouteStyle::Hash).as_deref(),
            Some("plasma")
        );
        assert_eq!(parse_route("#rings", RouteStyle::Hash).as_deref(), Some("rings"));
        assert_eq!(parse_route("rings", RouteStyle::Hash).as_deref(), Some("rings"));
        assert_eq!(parse_route("http://host/index.html", RouteStyle::Hash), None);
    }

    #[test]
    fn reflects_path_style_at_origin() {
        let location = Location::new("http://localhost:8000/gallery/", RouteStyle::Path);
        assert_eq!(
            location.reflect(&ShaderId::new("Waves.glsl")),
            "http://localhost:8000/Waves"
        );
    }

    #[test]
    fn reflects_hash_style_on_page() {
        let location = Location::new("http://localhost:8000/index.html#old", RouteStyle::Hash);
        assert_eq!(
            location.reflect(&ShaderId::new("Waves.glsl")),
            "http://localhost:8000/index.html#Waves"
        );
    }

    #[test]
    fn reflected_location_routes_back_to_same_shader() {
        let id = ShaderId::new("Tunnel.glsl");
        for style in [RouteStyle::Path, RouteStyle::Hash] {
            let location = Location::new("http://localhost:8000/", style);
            let route = parse_route(&location.reflect(&id), style).unwrap();
            assert!(id.matches_route(&route));
        }
    }
}
