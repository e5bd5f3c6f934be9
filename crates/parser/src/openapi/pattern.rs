//! Path pattern classification

/// Shape of a path that follows the collection/item layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternInfo {
    /// Whether the path ends in an item parameter (`/widgets/{widget}`)
    /// rather than a collection (`/widgets`)
    pub is_resource_pattern: bool,
    /// Name after the `:` suffix, e.g. `archive`
    pub custom_method_name: Option<String>,
    /// Path segments without the custom method suffix
    pub segments: Vec<String>,
}

impl PatternInfo {
    /// Segments joined back together, without leading slash or suffix
    pub fn pattern(&self) -> String {
        self.segments.join("/")
    }

    /// Final literal segment, i.e. the collection name
    pub fn collection(&self) -> Option<&str> {
        let index = if self.is_resource_pattern {
            self.segments.len().checked_sub(2)?
        } else {
            self.segments.len().checked_sub(1)?
        };
        self.segments.get(index).map(String::as_str)
    }

    /// Segments of the closest enclosing item, if any
    pub fn parent_segments(&self) -> Option<&[String]> {
        let own = if self.is_resource_pattern { 2 } else { 1 };
        let end = self.segments.len().checked_sub(own)?;
        (end >= 2).then(|| &self.segments[..end])
    }
}

/// Classify `path` as a collection or item pattern.
///
/// Literals must sit at even positions and `{param}` tokens at odd ones.
/// Anything else yields `None`; such paths are ignored rather than rejected.
pub fn classify(path: &str) -> Option<PatternInfo> {
    let (path, custom_method_name) = match path.rsplit_once(':') {
        Some((path, name)) if !name.is_empty() && !name.contains('/') => {
            (path, Some(name.to_string()))
        }
        Some(_) => return None,
        None => (path, None),
    };

    let path = path.strip_prefix('/')?;
    let segments: Vec<String> = path.split('/').map(str::to_string).collect();

    for (i, segment) in segments.iter().enumerate() {
        if segment.is_empty() {
            return None;
        }
        let is_param = segment.len() > 2 && segment.starts_with('{') && segment.ends_with('}');
        if (i % 2 == 1) != is_param {
            return None;
        }
        if !is_param && segment.contains(['{', '}']) {
            return None;
        }
    }

    Some(PatternInfo {
        is_resource_pattern: segments.len() % 2 == 0,
        custom_method_name,
        segments,
    })
}
