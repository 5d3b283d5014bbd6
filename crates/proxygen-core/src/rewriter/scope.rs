use crate::classifier::{FieldCatalog, FieldInfo};
use indexmap::IndexSet;

/// Entities whose fields a method may touch: its receiver's entity and
/// everything reachable from it through relation fields, plus any entity
/// the method mentions by type. Lives for one method rewrite.
pub struct RewriteScope<'c, 'a> {
    catalog: &'c FieldCatalog<'a>,
    entities: IndexSet<&'c str>,
}

impl<'c, 'a> RewriteScope<'c, 'a> {
    /// `None` when `root` is not an entity of the catalog.
    pub fn new(catalog: &'c FieldCatalog<'a>, root: &str) -> Option<Self> {
        let mut scope = Self {
            catalog,
            entities: IndexSet::new(),
        };
        scope.include(root).then_some(scope)
    }

    /// Adds `entity` and its relation closure. Returns false for names that
    /// are not entities.
    pub fn include(&mut self, entity: &str) -> bool {
        let Some(fields) = self.catalog.entity(entity) else {
            return false;
        };
        let mut queue = vec![fields.entity.name.as_str()];
        while let Some(next) = queue.pop() {
            if !self.entities.insert(next) {
                continue;
            }
            queue.extend(
                self.catalog
                    .relation_targets(next)
                    .filter(|target| !self.entities.contains(target)),
            );
        }
        true
    }

    pub fn contains(&self, entity: &str) -> bool {
        self.entities.contains(entity)
    }

    pub fn entities(&self) -> impl Iterator<Item = &'c str> + '_ {
        self.entities.iter().copied()
    }

    pub fn field(&self, entity: &str, field: &str) -> Option<&'c FieldInfo<'a>> {
        if !self.contains(entity) {
            return None;
        }
        self.catalog.field(entity, field)
    }
}
