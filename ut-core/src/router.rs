use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde_json::{json, Value};

use crate::builder::RouteDefinition;
use crate::errors::{UploadError, UtResult};
use crate::route::FileRoute;

/// An immutable map of route name → route.
///
/// Built once at startup and shared behind an `Arc`; every request reads it
/// without locking.
pub struct FileRouter<A> {
    routes: BTreeMap<String, Arc<FileRoute<A>>>,
}

impl<A> FileRouter<A>
where
    A: Send + 'static,
{
    pub fn builder() -> FileRouterBuilder<A> {
        FileRouterBuilder { routes: Vec::new() }
    }

    /// Build from a list of `(name, definition)` pairs.
    pub fn from_routes<I, S>(routes: I) -> UtResult<Self>
    where
        I: IntoIterator<Item = (S, RouteDefinition<A>)>,
        S: Into<String>,
    {
        routes
            .into_iter()
            .fold(Self::builder(), |b, (name, def)| b.route(name, def))
            .build()
    }
}

impl<A> FileRouter<A> {
    /// Look up a route by name.
    pub fn get(&self, name: &str) -> Option<&Arc<FileRoute<A>>> {
        self.routes.get(name)
    }

    /// Route names in sorted order.
    pub fn route_names(&self) -> Vec<&str> {
        self.routes.keys().map(|k| k.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// `[{ slug, config }]`, what `GET` on the endpoint returns.
    pub fn route_metadata(&self) -> Value {
        Value::Array(
            self.routes
                .iter()
                .map(|(slug, route)| json!({ "slug": slug, "config": route.config.to_json() }))
                .collect(),
        )
    }
}

impl<A> std::fmt::Debug for FileRouter<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileRouter")
            .field("routes", &self.routes.keys().collect::<Vec<_>>())
            .finish()
    }
}

pub struct FileRouterBuilder<A> {
    routes: Vec<(String, RouteDefinition<A>)>,
}

impl<A> FileRouterBuilder<A>
where
    A: Send + 'static,
{
    pub fn route<S>(mut self, name: S, definition: RouteDefinition<A>) -> Self
    where
        S: Into<String>,
    {
        self.routes.push((name.into(), definition));
        self
    }

    /// Finalize every route. Any problem is a `CONFIG_ERROR`.
    pub fn build(self) -> UtResult<FileRouter<A>> {
        let mut seen = HashSet::new();
        for (name, _) in &self.routes {
            if name.trim().is_empty() {
                return Err(UploadError::config_error("Route names must not be empty"));
            }
            if !seen.insert(name.as_str()) {
                return Err(UploadError::config_error(format!(
                    "Duplicate route name: {name:?}"
                )));
            }
        }

        let mut routes = BTreeMap::new();
        for (name, def) in self.routes {
            let route = def.finalize(&name)?;
            routes.insert(name, Arc::new(route));
        }

        Ok(FileRouter { routes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_builder, ErrorCode, RouteConfig, RouteLimits};

    fn image_route() -> RouteDefinition<()> {
        create_builder::<()>(None)
            .route(RouteConfig::new().image(RouteLimits::new()))
            .on_upload_complete(|_args| async move { Ok(()) })
    }

    #[test]
    fn identical_definitions_yield_identical_name_sets() {
        let build = || {
            FileRouter::builder()
                .route("b", image_route())
                .route("a", image_route())
                .build()
                .unwrap()
        };
        let (one, two) = (build(), build());
        assert_eq!(one.route_names(), two.route_names());
        assert_eq!(one.route_names(), vec!["a", "b"]);
        assert_eq!(one.route_metadata(), two.route_metadata());
    }

    #[test]
    fn duplicate_names_fail_at_build() {
        let err = FileRouter::builder()
            .route("avatar", image_route())
            .route("avatar", image_route())
            .build()
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigError);
        assert!(err.message.contains("avatar"));
    }

    #[test]
    fn missing_complete_callback_fails_at_build() {
        let def = create_builder::<()>(None).route(RouteConfig::new().image(RouteLimits::new()));
        let err = FileRouter::from_routes([("avatar", def)]).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigError);
    }

    #[test]
    fn invalid_limits_fail_at_build() {
        let def = create_builder::<()>(None)
            .route(RouteConfig::new().image(RouteLimits::new().max_file_size("lots")))
            .on_upload_complete(|_args| async move { Ok(()) });
        let err = FileRouter::from_routes([("avatar", def)]).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigError);
    }

    #[test]
    fn metadata_lists_expanded_config() {
        let router = FileRouter::from_routes([("avatar", image_route())]).unwrap();
        let meta = router.route_metadata();
        assert_eq!(meta[0]["slug"], "avatar");
        assert_eq!(meta[0]["config"]["image"]["maxFileSize"], "4MB");
    }
}
