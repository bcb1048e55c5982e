mod route;

pub use route::{parse_route, Location, RouteStyle};

use catalog::ShaderId;

#[derive(Debug, thiserror::Error)]
pub enum NavigatorError {
    #[error("cannot navigate an empty shader listing")]
    EmptyListing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Prev,
    Next,
}

/// Cyclic cursor over the sorted shader listing.
#[derive(Debug, Clone)]
pub struct Navigator {
    shaders: Vec<ShaderId>,
    index: usize,
}

impl Navigator {
    pub fn new(shaders: Vec<ShaderId>) -> Result<Self, NavigatorError> {
        if shaders.is_empty() {
            return Err(NavigatorError::EmptyListing);
        }
        Ok(Self { shaders, index: 0 })
    }

    /// Moves to the shader named by `route`, if any. Returns whether the route
    /// matched; an unmatched route leaves the cursor where it was.
    pub fn select_route(&mut self, route: &str) -> bool {
        match self.shaders.iter().position(|id| id.matches_route(route)) {
            Some(found) => {
                self.index = found;
                true
            }
            None => false,
        }
    }

    pub fn step(&mut self, direction: Direction) -> &ShaderId {
        let count = self.shaders.len();
        self.index = match direction {
            Direction::Prev => (self.index + count - 1) % count,
            Direction::Next => (self.index + 1) % count,
        };
        self.current()
    }

    pub fn current(&self) -> &ShaderId {
        &self.shaders[self.index]
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.shaders.len()
    }

    /// Always false: [`Navigator::new`] rejects an empty listing, so there is
    /// always a current shader.
    pub fn is_empty(&self) -> bool {
        self.shaders.is_empty()
    }

    pub fn shaders(&self) -> &[ShaderId] {
        &self.shaders
    }
}

#[cfg(test)]
mod tests {
    use catalog::normalize_listing;

    use super::*;

    fn navigator(names: &[&str]) -> Navigator {
        Navigator::new(names.iter().copied().map(ShaderId::new).collect()).unwrap()
    }

    #[test]
    fn rejects_empty_listing() {
        assert!(matches!(
            Navigator::new(Vec::new()),
            Err(NavigatorError::EmptyListing)
        ));
    }

    #[test]
    fn next_from_sorted_listing_selects_second() {
        let listing = normalize_listing(["shaderB.glsl", "shaderA.glsl"]);
        let mut navigator = Navigator::new(listing).unwrap();
        assert_eq!(navigator.current().as_str(), "shaderA.glsl");
        assert_eq!(navigator.step(Direction::Next).as_str(), "shaderB.glsl");
    }

    #[test]
    fn prev_and_next_wrap() {
        let mut navigator = navigator(&["a.glsl", "b.glsl", "c.glsl"]);
        assert_eq!(navigator.step(Direction::Prev).as_str(), "c.glsl");
        assert_eq!(navigator.step(Direction::Next).as_str(), "a.glsl");
        navigator.step(Direction::Next);
        navigator.step(Direction::Next);
        assert_eq!(navigator.step(Direction::Next).as_str(), "a.glsl");
    }

    #[test]
    fn prev_then_next_is_identity() {
        for start in 0..4 {
            let mut navigator = navigator(&["a.glsl", "b.glsl", "c.glsl", "d.glsl"]);
            for _ in 0..start {
                navigator.step(Direction::Next);
            }
            navigator.step(Direction::Prev);
            navigator.step(Direction::Next);
            assert_eq!(navigator.index(), start);
            navigator.step(Direction::Next);
            navigator.step(Direction::Prev);
            assert_eq!(navigator.index(), start);
        }
    }

    #[test]
    fn single_entry_stays_put() {
        let mut navigator = navigator(&["only.glsl"]);
        assert_eq!(navigator.len(), 1);
        assert!(!navigator.is_empty());
        assert_eq!(navigator.step(Direction::Prev).as_str(), "only.glsl");
        assert_eq!(navigator.step(Direction::Next).as_str(), "only.glsl");
    }

    #[test]
    fn route_selects_matching_shader() {
        let mut navigator = navigator(&["Aurora.glsl", "Tunnel.glsl"]);
        assert!(navigator.select_route("tunnel"));
        assert_eq!(navigator.index(), 1);
    }

    #[test]
    fn unmatched_route_falls_back_to_first() {
        let mut navigator = navigator(&["Aurora.glsl", "Tunnel.glsl"]);
        assert!(!navigator.select_route("missing"));
        assert_eq!(navigator.index(), 0);
    }
}
