//! Purpose: Record shapes shared by the Connection and Thread callers.
//! Exports: `Context`, `UserWithPubKey`, `UserInfo`, `PagingQuery`, `SortOrder`, `PagingList`,
//!          `Thread`, `ServerMessageInfo`, `Message`.
//! Role: Plain data; all wire mapping comes from `record!` tables.
//! Invariants: Field tables list every wire field; absent keys leave the default.
use bytes::Bytes;

use crate::core::error::Error;
use crate::core::mapper::{Decode, DecodeContext, Encode, Record, decode, decode_record, encode_record};
use crate::core::value::DynamicValue;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Context {
    pub user_id: String,
    pub context_id: String,
}

crate::record!(Context {
    UserId => user_id,
    ContextId => context_id,
});

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserWithPubKey {
    pub user_id: String,
    pub pub_key: String,
}

crate::record!(UserWithPubKey {
    UserId => user_id,
    PubKey => pub_key,
});

impl UserWithPubKey {
    pub fn new(user_id: impl Into<String>, pub_key: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            pub_key: pub_key.into(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct UserInfo {
    pub user: UserWithPubKey,
    pub is_active: bool,
}

crate::record!(UserInfo {
    User => user,
    IsActive => is_active,
});

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl Encode for SortOrder {
    fn encode(&self) -> DynamicValue {
        DynamicValue::string(self.as_str())
    }
}

/// Paging window; list calls send it as positional `skip, limit, sortOrder` arguments.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PagingQuery {
    pub skip: i64,
    pub limit: i64,
    pub sort_order: SortOrder,
}

impl PagingQuery {
    pub fn new(skip: i64, limit: i64, sort_order: SortOrder) -> Self {
        Self {
            skip,
            limit,
            sort_order,
        }
    }
}

impl Default for PagingQuery {
    fn default() -> Self {
        Self::new(0, 100, SortOrder::Desc)
    }
}

/// One page of a listing plus the total the server could return.
#[derive(Clone, Debug, PartialEq)]
pub struct PagingList<T> {
    pub total_available: i64,
    pub read_items: Vec<T>,
}

impl<T> Default for PagingList<T> {
    fn default() -> Self {
        Self {
            total_available: 0,
            read_items: Vec::new(),
        }
    }
}

// Written by hand: the generic parameter does not fit `record!`.
impl<T: Encode + Decode> Record for PagingList<T> {
    const FIELDS: &'static [&'static str] = &["TotalAvailable", "ReadItems"];
    const REQUIRED: &'static [&'static str] = Self::FIELDS;

    fn get_field(&self, name: &str) -> Option<DynamicValue> {
        match name {
            "TotalAvailable" => Some(self.total_available.encode()),
            "ReadItems" => Some(self.read_items.encode()),
            _ => None,
        }
    }

    fn set_field(
        &mut self,
        name: &str,
        value: &DynamicValue,
        cx: &DecodeContext<'_>,
    ) -> Result<bool, Error> {
        match name {
            "TotalAvailable" => self.total_available = decode(value, cx)?,
            "ReadItems" => self.read_items = decode(value, cx)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

impl<T: Encode + Decode> Encode for PagingList<T> {
    fn encode(&self) -> DynamicValue {
        encode_record(self)
    }
}

impl<T: Encode + Decode> Decode for PagingList<T> {
    fn from_value(value: &DynamicValue, cx: &DecodeContext<'_>) -> Result<Self, Error> {
        decode_record(value, cx)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Thread {
    pub context_id: String,
    pub thread_id: String,
    pub create_date: i64,
    pub creator: String,
    pub last_modification_date: i64,
    pub last_modifier: String,
    pub users: Vec<String>,
    pub managers: Vec<String>,
    pub version: i64,
    pub last_msg_date: i64,
    pub public_meta: Bytes,
    pub private_meta: Bytes,
    pub messages_count: i64,
    pub status_code: i64,
}

crate::record!(Thread {
    ContextId => context_id,
    ThreadId => thread_id,
    CreateDate => create_date,
    Creator => creator,
    LastModificationDate => last_modification_date,
    LastModifier => last_modifier,
    Users => users,
    Managers => managers,
    Version => version,
    LastMsgDate => last_msg_date,
    PublicMeta => public_meta,
    PrivateMeta => private_meta,
    MessagesCount => messages_count,
    StatusCode => status_code,
});

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ServerMessageInfo {
    pub thread_id: String,
    pub message_id: String,
    pub create_date: i64,
    pub author: String,
}

crate::record!(ServerMessageInfo {
    ThreadId => thread_id,
    MessageId => message_id,
    CreateDate => create_date,
    Author => author,
});

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Message {
    pub info: ServerMessageInfo,
    pub public_meta: Bytes,
    pub private_meta: Bytes,
    pub data: Bytes,
    pub author_pub_key: String,
    pub status_code: i64,
}

crate::record!(Message {
    Info => info,
    PublicMeta => public_meta,
    PrivateMeta => private_meta,
    Data => data,
    AuthorPubKey => author_pub_key,
    StatusCode => status_code,
});
