//! Read-only entity lookups used to resolve mentions.
//!
//! The engine never owns entity data. Hosts implement [`UserDirectory`],
//! [`ServerDirectory`] and [`ChannelDirectory`] over whatever stores they
//! already have, or hand over a [`DirectorySnapshot`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use smol_str::{SmolStr, format_smolstr};

/// Entity ids are signed: `-1` is the system id.
pub type EntityId = i64;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: EntityId,
    pub username: SmolStr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<SmolStr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<SmolStr>,
    /// CSS font family, or an `https://` font URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<SmolStr>,
    /// Name color shown in direct messages, `0xRRGGBB`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dm_color: Option<u32>,
}

impl User {
    pub fn new(id: EntityId, username: impl Into<SmolStr>) -> Self {
        Self {
            id,
            username: username.into(),
            ..Self::default()
        }
    }

    pub fn with_display_name(mut self, name: impl Into<SmolStr>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// A user's per-server profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub server_id: EntityId,
    pub user_id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<SmolStr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<SmolStr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<SmolStr>,
    #[serde(default)]
    pub roles: Vec<EntityId>,
}

impl Member {
    pub fn new(server_id: EntityId, user_id: EntityId) -> Self {
        Self {
            server_id,
            user_id,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: EntityId,
    pub name: SmolStr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    /// Higher wins when several colored roles apply.
    #[serde(default)]
    pub position: i32,
}

impl Role {
    pub fn new(id: EntityId, name: impl Into<SmolStr>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_position(mut self, position: i32) -> Self {
        self.position = position;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub id: EntityId,
    pub name: SmolStr,
    #[serde(default)]
    pub roles: Vec<Role>,
}

impl Server {
    pub fn new(id: EntityId, name: impl Into<SmolStr>) -> Self {
        Self {
            id,
            name: name.into(),
            roles: Vec::new(),
        }
    }

    pub fn role(&self, id: EntityId) -> Option<&Role> {
        self.roles.iter().find(|r| r.id == id)
    }
}

/// Channel kinds, numbered as the chat API numbers them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ChannelType {
    Category = 0,
    #[default]
    Text = 1,
    Voice = 2,
    Announcement = 3,
    Rules = 4,
    Thread = 5,
    Forum = 6,
    Calendar = 7,
    Document = 8,
    #[serde(rename = "dm")]
    DirectMessage = 9,
    #[serde(rename = "group_dm")]
    GroupDirectMessage = 10,
}

impl ChannelType {
    pub fn code(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: EntityId,
    pub name: SmolStr,
    #[serde(default)]
    pub channel_type: ChannelType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<EntityId>,
}

impl Channel {
    pub fn new(id: EntityId, name: impl Into<SmolStr>, channel_type: ChannelType) -> Self {
        Self {
            id,
            name: name.into(),
            channel_type,
            server_id: None,
        }
    }
}

/// User (and member) lookup.
pub trait UserDirectory {
    fn user(&self, id: EntityId) -> Option<&User>;

    fn member(&self, _server_id: EntityId, _user_id: EntityId) -> Option<&Member> {
        None
    }
}

/// Server lookup; roles come with the server.
pub trait ServerDirectory {
    fn server(&self, id: EntityId) -> Option<&Server>;
}

pub trait ChannelDirectory {
    fn channel(&self, id: EntityId) -> Option<&Channel>;
}

impl UserDirectory for () {
    fn user(&self, _id: EntityId) -> Option<&User> {
        None
    }
}

impl ServerDirectory for () {
    fn server(&self, _id: EntityId) -> Option<&Server> {
        None
    }
}

impl ChannelDirectory for () {
    fn channel(&self, _id: EntityId) -> Option<&Channel> {
        None
    }
}

impl<T: UserDirectory + ?Sized> UserDirectory for &T {
    fn user(&self, id: EntityId) -> Option<&User> {
        (*self).user(id)
    }

    fn member(&self, server_id: EntityId, user_id: EntityId) -> Option<&Member> {
        (*self).member(server_id, user_id)
    }
}

impl<T: ServerDirectory + ?Sized> ServerDirectory for &T {
    fn server(&self, id: EntityId) -> Option<&Server> {
        (*self).server(id)
    }
}

impl<T: ChannelDirectory + ?Sized> ChannelDirectory for &T {
    fn channel(&self, id: EntityId) -> Option<&Channel> {
        (*self).channel(id)
    }
}

impl<T: UserDirectory> UserDirectory for Option<T> {
    fn user(&self, id: EntityId) -> Option<&User> {
        self.as_ref().and_then(|d| d.user(id))
    }

    fn member(&self, server_id: EntityId, user_id: EntityId) -> Option<&Member> {
        self.as_ref().and_then(|d| d.member(server_id, user_id))
    }
}

impl<T: ServerDirectory> ServerDirectory for Option<T> {
    fn server(&self, id: EntityId) -> Option<&Server> {
        self.as_ref().and_then(|d| d.server(id))
    }
}

impl<T: ChannelDirectory> ChannelDirectory for Option<T> {
    fn channel(&self, id: EntityId) -> Option<&Channel> {
        self.as_ref().and_then(|d| d.channel(id))
    }
}

/// In-memory directory, serialized as plain lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "SnapshotLists", into = "SnapshotLists")]
pub struct DirectorySnapshot {
    users: HashMap<EntityId, User>,
    members: HashMap<(EntityId, EntityId), Member>,
    servers: HashMap<EntityId, Server>,
    channels: HashMap<EntityId, Channel>,
}

#[derive(Serialize, Deserialize)]
struct SnapshotLists {
    #[serde(default)]
    users: Vec<User>,
    #[serde(default)]
    members: Vec<Member>,
    #[serde(default)]
    servers: Vec<Server>,
    #[serde(default)]
    channels: Vec<Channel>,
}

impl From<SnapshotLists> for DirectorySnapshot {
    fn from(lists: SnapshotLists) -> Self {
        let mut snapshot = DirectorySnapshot::default();
        lists.users.into_iter().for_each(|u| snapshot.insert_user(u));
        lists.members.into_iter().for_each(|m| snapshot.insert_member(m));
        lists.servers.into_iter().for_each(|s| snapshot.insert_server(s));
        lists.channels.into_iter().for_each(|c| snapshot.insert_channel(c));
        snapshot
    }
}

impl From<DirectorySnapshot> for SnapshotLists {
    fn from(snapshot: DirectorySnapshot) -> Self {
        fn sorted<K, V>(map: HashMap<K, V>, key: impl Fn(&V) -> (EntityId, EntityId)) -> Vec<V> {
            let mut values: Vec<V> = map.into_values().collect();
            values.sort_by_key(|v| key(v));
            values
        }
        SnapshotLists {
            users: sorted(snapshot.users, |u| (u.id, 0)),
            members: sorted(snapshot.members, |m| (m.server_id, m.user_id)),
            servers: sorted(snapshot.servers, |s| (s.id, 0)),
            channels: sorted(snapshot.channels, |c| (c.id, 0)),
        }
    }
}

impl DirectorySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_user(&mut self, user: User) {
        self.users.insert(user.id, user);
    }

    pub fn insert_member(&mut self, member: Member) {
        self.members
            .insert((member.server_id, member.user_id), member);
    }

    pub fn insert_server(&mut self, server: Server) {
        self.servers.insert(server.id, server);
    }

    pub fn insert_channel(&mut self, channel: Channel) {
        self.channels.insert(channel.id, channel);
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.insert_user(user);
        self
    }

    pub fn with_member(mut self, member: Member) -> Self {
        self.insert_member(member);
        self
    }

    pub fn with_server(mut self, server: Server) -> Self {
        self.insert_server(server);
        self
    }

    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.insert_channel(channel);
        self
    }

    /// All users, ordered by id.
    pub fn users(&self) -> Vec<&User> {
        let mut users: Vec<&User> = self.users.values().collect();
        users.sort_by_key(|u| u.id);
        users
    }
}

impl UserDirectory for DirectorySnapshot {
    fn user(&self, id: EntityId) -> Option<&User> {
        self.users.get(&id)
    }

    fn member(&self, server_id: EntityId, user_id: EntityId) -> Option<&Member> {
        self.members.get(&(server_id, user_id))
    }
}

impl ServerDirectory for DirectorySnapshot {
    fn server(&self, id: EntityId) -> Option<&Server> {
        self.servers.get(&id)
    }
}

impl ChannelDirectory for DirectorySnapshot {
    fn channel(&self, id: EntityId) -> Option<&Channel> {
        self.channels.get(&id)
    }
}

/// Name shown for a user: nickname, then display name, then username.
pub fn display_name(user: &User, member: Option<&Member>) -> SmolStr {
    member
        .and_then(|m| m.nickname.clone())
        .or_else(|| user.display_name.clone())
        .unwrap_or_else(|| user.username.clone())
}

/// Font for a user's name; font URLs are wrapped for CSS.
pub fn name_font(user: &User, member: Option<&Member>) -> Option<SmolStr> {
    let font = member
        .and_then(|m| m.font.as_ref())
        .or(user.font.as_ref())?;
    if font.starts_with("https://") {
        Some(format_smolstr!("url({})", font))
    } else {
        Some(font.clone())
    }
}

pub fn avatar(user: &User, member: Option<&Member>) -> Option<SmolStr> {
    member
        .and_then(|m| m.avatar.clone())
        .or_else(|| user.avatar.clone())
}

/// Color of the highest-positioned colored role the member holds.
pub fn role_color(server: &Server, member: &Member) -> Option<u32> {
    server
        .roles
        .iter()
        .filter(|role| role.color.is_some() && member.roles.contains(&role.id))
        .max_by_key(|role| role.position)
        .and_then(|role| role.color)
}
