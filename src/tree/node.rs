use std::{
    collections::BTreeMap,
    fmt::{Debug, Display},
};

use super::{EdgeLength, NewickFormat, NodeId};

/// Comments starting with this prefix hold `key=value` features
pub(crate) const NHX_PREFIX: &str = "&&NHX:";

/// Characters that cannot appear in an unquoted newick name
const NEWICK_RESERVED: &[char] = &['(', ')', '[', ']', ',', ':', ';', '\'', '"'];

/// Writes a name so that it is read back unchanged, quoting it when needed
fn quote_name(name: &str) -> String {
    if name.chars().any(|c| c.is_whitespace() || NEWICK_RESERVED.contains(&c)) {
        format!("'{}'", name.replace('\'', "''"))
    } else {
        name.to_string()
    }
}

/// Escapes the separators of NHX fields with a backslash
fn escape_nhx(field: &str) -> String {
    let mut escaped = String::with_capacity(field.len());
    for c in field.chars() {
        if matches!(c, '\\' | ':' | '=' | '[' | ']') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Splits the body of an NHX comment into `(key, value)` pairs,
/// fields without a `=` are ignored.
fn parse_nhx(nhx: &str) -> Vec<(String, String)> {
    let mut fields = vec![];
    let mut key = String::new();
    let mut value: Option<String> = None;

    let mut chars = nhx.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    value.as_mut().unwrap_or(&mut key).push(escaped);
                }
            }
            ':' => {
                if let Some(value) = value.take() {
                    fields.push((std::mem::take(&mut key), value));
                }
                key.clear();
            }
            '=' if value.is_none() => value = Some(String::new()),
            _ => value.as_mut().unwrap_or(&mut key).push(c),
        }
    }
    if let Some(value) = value {
        fields.push((key, value));
    }

    fields
}

#[derive(Clone)]
/// A node of the Tree
pub struct Node {
    /// Index of the node
    pub id: NodeId,
    /// Name of the node
    pub name: Option<String>,
    /// Index of the parent node
    pub parent: Option<NodeId>,
    /// Indices of child nodes
    pub children: Vec<NodeId>,
    /// length of branch between parent and node
    pub parent_edge: Option<EdgeLength>,
    /// Optional comment attached to node
    pub comment: Option<String>,
    /// Named attributes read from NHX comments
    pub features: BTreeMap<String, String>,
    /// Number of edges to root
    pub(crate) depth: usize,
}

impl Node {
    /// Creates a new Node
    pub fn new() -> Self {
        Self {
            id: 0,
            name: None,
            parent: None,
            children: vec![],
            parent_edge: None,
            comment: None,
            features: BTreeMap::new(),
            depth: 0,
        }
    }

    /// Creates a new named Node
    pub fn new_named(name: &str) -> Self {
        Self {
            name: Some(String::from(name)),
            ..Self::new()
        }
    }

    /// Sets the internal Node name
    pub fn set_name(&mut self, name: String) {
        self.name = Some(name);
    }

    /// Sets the internal Node id
    pub fn set_id(&mut self, id: NodeId) {
        self.id = id;
    }

    /// Set the parent node
    pub fn set_parent(&mut self, parent: NodeId, parent_edge: Option<EdgeLength>) {
        self.parent = Some(parent);
        self.parent_edge = parent_edge;
    }

    /// Sets the depth of the node
    pub fn set_depth(&mut self, depth: usize) {
        self.depth = depth;
    }

    /// Gets the depth of the node
    pub fn get_depth(&self) -> usize {
        self.depth
    }

    /// Adds a child to the node
    /// ```
    /// use phylodiff::tree::Node;
    ///
    /// let mut parent = Node::new();
    /// parent.id = 0;
    /// let mut child = Node::new();
    /// child.id = 1;
    ///
    /// child.set_parent(parent.id, Some(0.1));
    /// parent.add_child(child.id);
    ///
    /// assert_eq!(child.parent_edge, Some(0.1));
    /// assert_eq!(parent.children, vec![1]);
    /// ```
    pub fn add_child(&mut self, child: NodeId) {
        self.children.push(child);
    }

    /// Gets the value of a named feature
    pub fn get_feature(&self, key: &str) -> Option<&str> {
        self.features.get(key).map(String::as_str)
    }

    /// Sets the value of a named feature
    pub fn set_feature(&mut self, key: &str, value: &str) {
        self.features.insert(key.to_string(), value.to_string());
    }

    /// Attaches a comment to the node. NHX comments
    /// (i.e. `&&NHX:key=value:other=value`) are stored as features.
    /// ```
    /// use phylodiff::tree::Node;
    ///
    /// let mut node = Node::new_named("A");
    /// node.set_comment("&&NHX:taxid=9606:flag=Red".into());
    ///
    /// assert_eq!(node.get_feature("taxid"), Some("9606"));
    /// assert_eq!(node.get_feature("flag"), Some("Red"));
    /// assert!(node.comment.is_none());
    /// ```
    pub fn set_comment(&mut self, comment: String) {
        match comment.strip_prefix(NHX_PREFIX) {
            Some(nhx) => {
                for (key, value) in parse_nhx(nhx) {
                    self.features.insert(key, value);
                }
            }
            None => self.comment = Some(comment),
        }
    }

    /// Length of the branch to the parent, unit length when missing
    pub fn branch_length(&self) -> EdgeLength {
        self.parent_edge.unwrap_or(1.0)
    }

    /// Check if the node is a tip node
    pub fn is_tip(&self) -> bool {
        self.children.is_empty()
    }

    /// Check if the node is a root node
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    fn format_name(&self) -> String {
        self.name.as_deref().map(quote_name).unwrap_or_default()
    }

    fn format_length(&self) -> String {
        self.parent_edge
            .map(|v| format!(":{v}"))
            .unwrap_or_default()
    }

    fn format_comment(&self) -> String {
        self.comment
            .clone()
            .map(|v| format!("[{v}]"))
            .unwrap_or_default()
    }

    fn format_features<'a>(&self, features: impl Iterator<Item = (&'a str, &'a str)>) -> String {
        let fields: Vec<_> = features
            .map(|(k, v)| format!("{}={}", escape_nhx(k), escape_nhx(v)))
            .collect();
        if fields.is_empty() {
            String::new()
        } else {
            format!("[{NHX_PREFIX}{}]", fields.join(":"))
        }
    }

    /// Returns String with node in newick format
    pub fn to_newick(&self, format: &NewickFormat) -> String {
        match format {
            NewickFormat::AllFields => {
                self.format_name()
                    + &self.format_length()
                    + &self.format_comment()
                    + &self.format_features(
                        self.features.iter().map(|(k, v)| (k.as_str(), v.as_str())),
                    )
            }
            NewickFormat::NoComments => self.format_name() + &self.format_length(),
            NewickFormat::OnlyNames => self.format_name(),
            NewickFormat::Topology => String::new(),
            NewickFormat::Features(keys) => {
                self.format_name()
                    + &self.format_length()
                    + &self.format_features(
                        keys.iter()
                            .filter_map(|k| self.get_feature(k).map(|v| (k.as_str(), v))),
                    )
            }
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        if self.parent.is_none() != other.parent.is_none() {
            return false;
        }

        let parent_edges_equal = match (self.parent_edge, other.parent_edge) {
            (None, None) => true,
            (Some(l1), Some(l2)) => (l1 - l2).abs() < f64::EPSILON,
            _ => false,
        };

        self.name == other.name
            && self.features == other.features
            && self.children.len() == other.children.len()
            && parent_edges_equal
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new()
    }
}

impl Eq for Node {}

impl Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = self.name.as_deref().unwrap_or_default();
        match self.parent_edge {
            Some(l) => write!(f, "({l:.3}) {name}"),
            None => write!(f, "{name}"),
        }
    }
}

impl Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({:?}) {:?} Id[{}] Parent[{:?}] Depth[{:?}] Features[{:?}] Children({:?})",
            self.parent_edge,
            self.name,
            self.id,
            self.parent,
            self.depth,
            self.features,
            self.children,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_comments_are_kept() {
        let mut node = Node::new_named("A");
        node.set_comment("bootstrap 90".into());

        assert_eq!(node.comment.as_deref(), Some("bootstrap 90"));
        assert!(node.features.is_empty());
    }

    #[test]
    fn write_selected_features() {
        let mut node = Node::new_named("A");
        node.parent_edge = Some(0.5);
        node.set_comment("&&NHX:taxid=9606:flag=Red".into());

        assert_eq!(
            node.to_newick(&NewickFormat::AllFields),
            "A:0.5[&&NHX:flag=Red:taxid=9606]"
        );
        assert_eq!(
            node.to_newick(&NewickFormat::Features(vec!["taxid".into()])),
            "A:0.5[&&NHX:taxid=9606]"
        );
        assert_eq!(
            node.to_newick(&NewickFormat::Features(vec!["missing".into()])),
            "A:0.5"
        );
        assert_eq!(node.to_newick(&NewickFormat::NoComments), "A:0.5");
        assert_eq!(node.to_newick(&NewickFormat::Topology), "");
    }

    #[test]
    fn names_are_quoted_when_needed() {
        assert_eq!(quote_name("Tip_1"), "Tip_1");
        assert_eq!(quote_name("Homo sapiens"), "'Homo sapiens'");
        assert_eq!(quote_name("A,1"), "'A,1'");
        assert_eq!(quote_name("O'Brien"), "'O''Brien'");
    }

    #[test]
    fn feature_separators_are_escaped() {
        let mut node = Node::new_named("A");
        node.set_feature("id", "urn:c=1");
        node.set_feature("note", "[x]");

        let newick = node.to_newick(&NewickFormat::AllFields);
        assert_eq!(newick, r"A[&&NHX:id=urn\:c\=1:note=\[x\]]");

        let comment = newick
            .strip_prefix("A[")
            .and_then(|c| c.strip_suffix(']'))
            .unwrap();
        let mut copy = Node::new();
        copy.set_comment(comment.to_string());
        assert_eq!(copy.features, node.features);
    }

    #[test]
    fn missing_length_is_unit() {
        let mut node = Node::new();
        assert_eq!(node.branch_length(), 1.0);
        node.parent_edge = Some(0.25);
        assert_eq!(node.branch_length(), 0.25);
    }
}
