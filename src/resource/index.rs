//! In-memory registry of resources and the links that place them

use std::collections::{BTreeMap, HashMap};

use super::types::{Link, Resource, ResourceWithLink};
use super::ResourceError;

/// Resources keyed by id, links keyed by id
///
/// A link always points at a registered resource: links for unknown
/// resources are refused and removing a resource removes its links.
/// Removing a link leaves its resource in place.
#[derive(Debug, Default)]
pub struct ResourceIndex {
    resources: HashMap<String, Resource>,
    links: HashMap<String, Link>,
}

impl ResourceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a resource, returning the previous one
    pub fn insert_resource(&mut self, resource: Resource) -> Option<Resource> {
        self.resources.insert(resource.id.clone(), resource)
    }

    /// Insert or replace a link
    pub fn insert_link(&mut self, link: Link) -> Result<Option<Link>, ResourceError> {
        if !self.resources.contains_key(&link.resource_id) {
            return Err(ResourceError::UnknownResource(link.resource_id));
        }
        Ok(self.links.insert(link.id.clone(), link))
    }

    /// Register a combined record
    pub fn insert(&mut self, combined: ResourceWithLink) -> Result<(), ResourceError> {
        let (resource, link) = combined.into_parts();
        self.insert_resource(resource);
        self.insert_link(link)?;
        Ok(())
    }

    pub fn remove_link(&mut self, link_id: &str) -> Option<Link> {
        self.links.remove(link_id)
    }

    /// Remove a resource and every link placing it
    pub fn remove_resource(&mut self, resource_id: &str) -> Option<(Resource, Vec<Link>)> {
        let resource = self.resources.remove(resource_id)?;
        let owned: Vec<String> = self
            .links
            .values()
            .filter(|link| link.resource_id == resource_id)
            .map(|link| link.id.clone())
            .collect();
        let links = owned
            .iter()
            .filter_map(|id| self.links.remove(id))
            .collect();
        Some((resource, links))
    }

    pub fn resource(&self, resource_id: &str) -> Option<&Resource> {
        self.resources.get(resource_id)
    }

    pub fn link(&self, link_id: &str) -> Option<&Link> {
        self.links.get(link_id)
    }

    pub fn links_for(&self, resource_id: &str) -> Vec<&Link> {
        self.links
            .values()
            .filter(|link| link.resource_id == resource_id)
            .collect()
    }

    pub fn resource_with_link(&self, link_id: &str) -> Result<ResourceWithLink, ResourceError> {
        let link = self
            .links
            .get(link_id)
            .ok_or_else(|| ResourceError::UnknownLink(link_id.to_string()))?;
        let resource = self
            .resources
            .get(&link.resource_id)
            .ok_or_else(|| ResourceError::UnknownResource(link.resource_id.clone()))?;
        ResourceWithLink::new(resource.clone(), link.clone())
    }

    /// Visible placements grouped by link target, ready for `addResourceIcons`
    ///
    /// Groups come out ordered by target id, links without a target last.
    /// Within a group, links are ordered by `order` then id.
    pub fn icon_groups(&self) -> Vec<Vec<ResourceWithLink>> {
        let mut groups: BTreeMap<(bool, String), Vec<&Link>> = BTreeMap::new();
        for link in self.links.values() {
            let visible = self
                .resources
                .get(&link.resource_id)
                .is_some_and(Resource::is_visible);
            if !visible {
                continue;
            }
            let key = match &link.target_id {
                Some(target) => (false, target.clone()),
                None => (true, String::new()),
            };
            groups.entry(key).or_default().push(link);
        }

        groups
            .into_values()
            .map(|mut links| {
                links.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
                links
                    .into_iter()
                    .filter_map(|link| self.resource_with_link(&link.id).ok())
                    .collect()
            })
            .collect()
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::types::fixtures::{link, resource};

    #[test]
    fn test_link_requires_known_resource() {
        let mut index = ResourceIndex::new();
        assert!(matches!(
            index.insert_link(link("l1", "r1", "p1")),
            Err(ResourceError::UnknownResource(id)) if id == "r1"
        ));
        index.insert_resource(resource("r1"));
        assert!(index.insert_link(link("l1", "r1", "p1")).unwrap().is_none());
    }

    #[test]
    fn test_removing_link_keeps_resource() {
        let mut index = ResourceIndex::new();
        index.insert_resource(resource("r1"));
        index.insert_link(link("l1", "r1", "p1")).unwrap();

        assert!(index.remove_link("l1").is_some());
        assert!(index.resource("r1").is_some());
        assert_eq!(index.link_count(), 0);
    }

    #[test]
    fn test_removing_resource_removes_its_links() {
        let mut index = ResourceIndex::new();
        index.insert_resource(resource("r1"));
        index.insert_resource(resource("r2"));
        index.insert_link(link("l1", "r1", "p1")).unwrap();
        index.insert_link(link("l2", "r1", "p2")).unwrap();
        index.insert_link(link("l3", "r2", "p1")).unwrap();

        let (removed, links) = index.remove_resource("r1").unwrap();
        assert_eq!(removed.id, "r1");
        assert_eq!(links.len(), 2);
        assert_eq!(index.link_count(), 1);
        assert!(index.link("l3").is_some());
        assert!(index.remove_resource("r1").is_none());
    }

    #[test]
    fn test_icon_groups_by_target() {
        let mut index = ResourceIndex::new();
        index.insert_resource(resource("r1"));
        index.insert_resource(resource("r2"));
        let mut hidden = resource("r3");
        hidden.invisible = Some(true);
        index.insert_resource(hidden);

        let mut first = link("l2", "r2", "p1");
        first.order = Some(1);
        let mut second = link("l1", "r1", "p1");
        second.order = Some(2);
        index.insert_link(first).unwrap();
        index.insert_link(second).unwrap();
        index.insert_link(link("l3", "r1", "p2")).unwrap();
        index.insert_link(link("l4", "r3", "p2")).unwrap();

        let groups = index.icon_groups();
        assert_eq!(groups.len(), 2);
        let ids: Vec<Vec<&str>> = groups
            .iter()
            .map(|group| group.iter().map(|r| r.link().id.as_str()).collect())
            .collect();
        assert_eq!(ids, vec![vec!["l2", "l1"], vec!["l3"]]);
    }

    #[test]
    fn test_insert_combined_record() {
        let mut index = ResourceIndex::new();
        let combined = ResourceWithLink::new(resource("r1"), link("l1", "r1", "p1")).unwrap();
        index.insert(combined.clone()).unwrap();
        assert_eq!(index.resource_with_link("l1").unwrap(), combined);
        assert!(matches!(
            index.resource_with_link("nope"),
            Err(ResourceError::UnknownLink(_))
        ));
    }
}
