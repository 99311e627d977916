use crate::{
    distribution::{Name, Reference},
    error::*,
};
use std::fmt;

/// Registry used when the image name does not specify one
pub const DEFAULT_REGISTRY: &str = "https://registry-1.docker.io";

/// Hosts which are served by [DEFAULT_REGISTRY]
const DEFAULT_REGISTRY_ALIASES: [&str; 2] = ["docker.io", "index.docker.io"];

/// Image name in the form `[registry/]repository[:tag|@digest]`
///
/// ```
/// use ocipull::ImageName;
///
/// let name = ImageName::parse("registry.io/name/uwubuntu:newest").unwrap();
/// assert_eq!(name.registry, "https://registry.io");
/// assert_eq!(name.name.as_str(), "name/uwubuntu");
/// assert_eq!(name.reference.to_string(), "newest");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageName {
    /// Base URL of registry, with scheme and without trailing slash
    pub registry: String,
    pub name: Name,
    pub reference: Reference,
}

impl fmt::Display for ImageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let separator = match self.reference {
            Reference::Tag(_) => ':',
            Reference::Digest(_) => '@',
        };
        write!(
            f,
            "{}/{}{}{}",
            self.registry, self.name, separator, self.reference
        )
    }
}

impl ImageName {
    pub fn parse(image: &str) -> Result<Self> {
        let image = image.trim();
        if image.is_empty() {
            return Err(Error::InvalidName(image.to_string()));
        }

        let (rest, reference) = if let Some((rest, digest)) = image.split_once('@') {
            let reference = Reference::from_digest(digest)?;
            // Tag in `name:tag@digest` is checked, but the digest is pulled
            match rest.rsplit_once(':') {
                Some((name, tag)) if !tag.contains('/') => {
                    Reference::new(tag)?;
                    (name, reference)
                }
                _ => (rest, reference),
            }
        } else {
            match image.rsplit_once(':') {
                // `registry.io:5000/name` has no tag
                Some((rest, tag)) if !tag.contains('/') => (rest, Reference::new(tag)?),
                _ => (image, Reference::default()),
            }
        };

        let segments: Vec<&str> = rest.split('/').collect();
        let (registry, name) = match segments.as_slice() {
            [name] => (DEFAULT_REGISTRY.to_string(), format!("library/{}", name)),
            [host, path @ ..] if host.contains('.') || host.contains(':') => {
                if DEFAULT_REGISTRY_ALIASES.contains(host) {
                    let name = match path {
                        [name] => format!("library/{}", name),
                        _ => path.join("/"),
                    };
                    (DEFAULT_REGISTRY.to_string(), name)
                } else {
                    (normalize_registry(host), path.join("/"))
                }
            }
            _ => (DEFAULT_REGISTRY.to_string(), rest.to_string()),
        };

        Ok(ImageName {
            registry,
            name: Name::new(&name)?,
            reference,
        })
    }
}

/// Force `https://` scheme and drop trailing slash
pub fn normalize_registry(base: &str) -> String {
    let host = base
        .strip_prefix("http://")
        .or_else(|| base.strip_prefix("https://"))
        .unwrap_or(base);
    format!("https://{}", host.trim_end_matches('/'))
}
