//! Chat targets: contacts, groups and rooms.
//!
//! [`EntityCollections`] holds the three lists the client keeps in memory.
//! Lookups walk contacts, then groups, then rooms, and return the first hit.

use std::sync::OnceLock;
use talk_types::{Contact, Group, Mid, Room};

/// Which collection an entity lives in. Also the refresh target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// Direct contact
    Contact,
    /// Named group
    Group,
    /// Unnamed room
    Room,
}

/// A room together with its display name, computed on first use.
#[derive(Debug, Clone)]
pub struct RoomEntry {
    room: Room,
    name: OnceLock<String>,
}

impl PartialEq for RoomEntry {
    fn eq(&self, other: &Self) -> bool {
        self.room == other.room
    }
}

impl Eq for RoomEntry {}

impl RoomEntry {
    /// Wrap a room.
    pub fn new(room: Room) -> Self {
        Self {
            room,
            name: OnceLock::new(),
        }
    }

    /// The wrapped room.
    pub fn room(&self) -> &Room {
        &self.room
    }

    /// Display name, see [`room_name`].
    pub fn name(&self) -> &str {
        self.name.get_or_init(|| room_name(&self.room))
    }
}

/// A chat target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    /// Direct contact
    Contact(Contact),
    /// Named group
    Group(Group),
    /// Unnamed room
    Room(RoomEntry),
}

impl Entity {
    /// Entity identifier. Also the message box id of its conversation.
    pub fn id(&self) -> &Mid {
        match self {
            Entity::Contact(contact) => &contact.mid,
            Entity::Group(group) => &group.id,
            Entity::Room(entry) => &entry.room.mid,
        }
    }

    /// Human-readable name.
    pub fn name(&self) -> &str {
        match self {
            Entity::Contact(contact) => &contact.display_name,
            Entity::Group(group) => &group.name,
            Entity::Room(entry) => entry.name(),
        }
    }

    /// Collection this entity belongs to.
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Contact(_) => EntityKind::Contact,
            Entity::Group(_) => EntityKind::Group,
            Entity::Room(_) => EntityKind::Room,
        }
    }
}

impl From<Contact> for Entity {
    fn from(contact: Contact) -> Self {
        Entity::Contact(contact)
    }
}

impl From<Group> for Entity {
    fn from(group: Group) -> Self {
        Entity::Group(group)
    }
}

impl From<Room> for Entity {
    fn from(room: Room) -> Self {
        Entity::Room(RoomEntry::new(room))
    }
}

/// Room display name.
///
/// The first three participant names joined with no separator, `...` when
/// there are more, then the participant count in parentheses.
pub fn room_name(room: &Room) -> String {
    let mut name: String = room
        .contacts
        .iter()
        .take(3)
        .map(|c| c.display_name.as_str())
        .collect();
    if room.contacts.len() > 3 {
        name.push_str("...");
    }
    name.push_str(&format!("({})", room.contacts.len()));
    name
}

/// Sort contacts by display name (byte order, stable).
pub fn sort_contacts(contacts: &mut [Contact]) {
    contacts.sort_by(|a, b| a.display_name.cmp(&b.display_name));
}

/// Build the group list: invited groups first, then joined, stably sorted by name.
pub fn merge_groups(invited: Vec<Group>, joined: Vec<Group>) -> Vec<Group> {
    let mut groups = invited;
    groups.extend(joined);
    groups.sort_by(|a, b| a.name.cmp(&b.name));
    groups
}

/// The in-memory contact, group and room lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityCollections {
    /// Contacts, sorted by display name
    pub contacts: Vec<Contact>,
    /// Groups, invited and joined
    pub groups: Vec<Group>,
    /// Rooms, in server order
    pub rooms: Vec<Room>,
}

impl EntityCollections {
    /// Create empty collections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Find an entity by id across contacts, groups and rooms, in that order.
    pub fn find(&self, id: &Mid) -> Option<Entity> {
        [EntityKind::Contact, EntityKind::Group, EntityKind::Room]
            .into_iter()
            .find_map(|kind| self.find_kind(kind, id))
    }

    /// Find an entity by id in one collection.
    pub fn find_kind(&self, kind: EntityKind, id: &Mid) -> Option<Entity> {
        match kind {
            EntityKind::Contact => self
                .contacts
                .iter()
                .find(|c| &c.mid == id)
                .cloned()
                .map(Entity::from),
            EntityKind::Group => self
                .groups
                .iter()
                .find(|g| &g.id == id)
                .cloned()
                .map(Entity::from),
            EntityKind::Room => self
                .rooms
                .iter()
                .find(|r| &r.mid == id)
                .cloned()
                .map(Entity::from),
        }
    }

    /// Total number of entities.
    pub fn len(&self) -> usize {
        self.contacts.len() + self.groups.len() + self.rooms.len()
    }

    /// Check whether all collections are empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(names: &[&str]) -> Room {
        Room {
            mid: Mid::from("r-1"),
            contacts: names
                .iter()
                .enumerate()
                .map(|(i, n)| Contact::new(format!("u-{}", i), *n))
                .collect(),
        }
    }

    #[test]
    fn room_name_with_three_members() {
        assert_eq!(room_name(&room(&["Ann", "Bob", "Cy"])), "AnnBobCy(3)");
    }

    #[test]
    fn room_name_truncates_after_three() {
        assert_eq!(
            room_name(&room(&["Ann", "Bob", "Cy", "Dee", "Eve"])),
            "AnnBobCy...(5)"
        );
    }

    #[test]
    fn room_name_with_one_member() {
        assert_eq!(room_name(&room(&["Ann"])), "Ann(1)");
    }

    #[test]
    fn room_entity_caches_name() {
        let entity = Entity::from(room(&["Ann", "Bob"]));
        assert_eq!(entity.name(), "AnnBob(2)");
        assert_eq!(entity.name(), "AnnBob(2)");
        assert_eq!(entity.kind(), EntityKind::Room);
        assert_eq!(entity.id(), "r-1");
    }

    #[test]
    fn contacts_sort_by_byte_order() {
        let mut contacts = vec![
            Contact::new("u-1", "bob"),
            Contact::new("u-2", "Zed"),
            Contact::new("u-3", "alice"),
        ];
        sort_contacts(&mut contacts);

        let names: Vec<&str> = contacts.iter().map(|c| c.display_name.as_str()).collect();
        // uppercase sorts before lowercase
        assert_eq!(names, vec!["Zed", "alice", "bob"]);
    }

    #[test]
    fn merge_groups_puts_invited_first_on_ties() {
        let invited = vec![Group::new("g-inv", "Team"), Group::new("g-a", "Alpha")];
        let joined = vec![Group::new("g-join", "Team"), Group::new("g-b", "Beta")];

        let merged = merge_groups(invited, joined);
        let ids: Vec<&str> = merged.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, vec!["g-a", "g-b", "g-inv", "g-join"]);
    }

    #[test]
    fn find_walks_contacts_then_groups_then_rooms() {
        let collections = EntityCollections {
            contacts: vec![Contact::new("x-1", "Contact")],
            groups: vec![Group::new("x-1", "Group"), Group::new("g-2", "Other")],
            rooms: vec![room(&["Ann"])],
        };

        let hit = collections.find(&Mid::from("x-1")).unwrap();
        assert_eq!(hit.kind(), EntityKind::Contact);

        let hit = collections.find(&Mid::from("g-2")).unwrap();
        assert_eq!(hit.kind(), EntityKind::Group);
        assert_eq!(hit.name(), "Other");

        let hit = collections.find(&Mid::from("r-1")).unwrap();
        assert_eq!(hit.kind(), EntityKind::Room);

        assert!(collections.find(&Mid::from("nobody")).is_none());
    }

    #[test]
    fn find_kind_limits_to_one_collection() {
        let collections = EntityCollections {
            contacts: vec![Contact::new("x-1", "Contact")],
            groups: vec![Group::new("x-1", "Group")],
            rooms: vec![],
        };

        let hit = collections
            .find_kind(EntityKind::Group, &Mid::from("x-1"))
            .unwrap();
        assert_eq!(hit.name(), "Group");
        assert!(collections
            .find_kind(EntityKind::Room, &Mid::from("x-1"))
            .is_none());
        assert_eq!(collections.len(), 2);
    }
}
