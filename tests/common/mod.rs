//! Shared fixtures for the bring-up tests: an in-memory hardware
//! description tree the scenarios can shape per test.

#![allow(dead_code)]

use bootdm::{Hdt, HdtNode, MalformedProperty};

struct FakeNode {
    name: String,
    parent: Option<usize>,
    children: Vec<usize>,
    props: Vec<(String, Vec<u8>)>,
    poisoned: Vec<String>,
    enabled: bool,
    pre_reloc: bool,
}

/// An in-memory HDT built by the tests.
///
/// Handles are indexes into the node vector; node 0 is the root.
pub struct FakeHdt {
    nodes: Vec<FakeNode>,
}

impl FakeHdt {
    pub fn new() -> Self {
        Self {
            nodes: vec![FakeNode {
                name: String::new(),
                parent: None,
                children: Vec::new(),
                props: Vec::new(),
                poisoned: Vec::new(),
                enabled: true,
                pre_reloc: false,
            }],
        }
    }

    pub fn root_node(&self) -> HdtNode {
        HdtNode(0)
    }

    pub fn add(&mut self, parent: HdtNode, name: &str) -> HdtNode {
        let index = self.nodes.len();
        self.nodes.push(FakeNode {
            name: String::from(name),
            parent: Some(parent.0 as usize),
            children: Vec::new(),
            props: Vec::new(),
            poisoned: Vec::new(),
            enabled: true,
            pre_reloc: false,
        });
        self.nodes[parent.0 as usize].children.push(index);
        HdtNode(index as u32)
    }

    /// Sets the `compatible` property from highest to lowest priority.
    pub fn set_compatible(&mut self, node: HdtNode, compats: &[&str]) {
        let mut blob = Vec::new();
        for compat in compats {
            blob.extend_from_slice(compat.as_bytes());
            blob.push(0);
        }
        self.set_property(node, "compatible", &blob);
    }

    pub fn set_property(&mut self, node: HdtNode, name: &str, bytes: &[u8]) {
        self.nodes[node.0 as usize]
            .props
            .push((String::from(name), bytes.to_vec()));
    }

    /// Makes reads of the named property report malformed tree data.
    pub fn poison_property(&mut self, node: HdtNode, name: &str) {
        self.nodes[node.0 as usize].poisoned.push(String::from(name));
    }

    pub fn set_disabled(&mut self, node: HdtNode) {
        self.nodes[node.0 as usize].enabled = false;
    }

    pub fn set_pre_reloc(&mut self, node: HdtNode) {
        self.nodes[node.0 as usize].pre_reloc = true;
    }

    fn node(&self, handle: HdtNode) -> &FakeNode {
        &self.nodes[handle.0 as usize]
    }
}

impl Hdt for FakeHdt {
    fn root(&self) -> Option<HdtNode> {
        Some(HdtNode(0))
    }

    fn first_subnode(&self, node: HdtNode) -> Option<HdtNode> {
        self.node(node)
            .children
            .first()
            .map(|&i| HdtNode(i as u32))
    }

    fn next_subnode(&self, node: HdtNode) -> Option<HdtNode> {
        let parent = self.node(node).parent?;
        let siblings = &self.nodes[parent].children;
        let at = siblings.iter().position(|&i| i == node.0 as usize)?;
        siblings.get(at + 1).map(|&i| HdtNode(i as u32))
    }

    fn is_enabled(&self, node: HdtNode) -> bool {
        self.node(node).enabled
    }

    fn pre_reloc(&self, node: HdtNode) -> bool {
        self.node(node).pre_reloc
    }

    fn name(&self, node: HdtNode) -> &str {
        &self.node(node).name
    }

    fn property(&self, node: HdtNode, name: &str) -> Result<Option<&[u8]>, MalformedProperty> {
        let record = self.node(node);
        if record.poisoned.iter().any(|p| p == name) {
            return Err(MalformedProperty);
        }
        Ok(record
            .props
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, bytes)| bytes.as_slice()))
    }

    fn lookup_path(&self, path: &str) -> Option<HdtNode> {
        let mut current = 0usize;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current = *self.nodes[current]
                .children
                .iter()
                .find(|&&i| self.nodes[i].name == segment)?;
        }
        Some(HdtNode(current as u32))
    }
}
