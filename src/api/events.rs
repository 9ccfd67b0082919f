//! Purpose: Event payloads delivered through the event queue, and their discriminators.
//! Exports: `Event`, `EventRecord`, `BaseEvent`, the per-event record types, `decode_event`,
//!          `tagged`, `BUILTIN_EVENTS`, `EventRegistry`, `builtin_registry`, `shared_registry`.
//! Role: The only polymorphic decode target; resolution goes through `EventRegistry`.
//! Invariants: Every event type's discriminator appears in `BUILTIN_EVENTS` exactly once.
//! Invariants: Missing or unregistered discriminators decode as `Event::Unknown`, never an error.
use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::api::types::{Message, Thread};
use crate::core::error::Error;
use crate::core::mapper::{Decode, DecodeContext, Encode, Record, decode_record};
use crate::core::registry::{Decoder, TYPE_KEY, TypeRegistry, discriminator};
use crate::core::value::DynamicValue;

pub type EventDecoder = Decoder<Event>;
pub type EventRegistry = TypeRegistry<Event>;

/// A concrete event record bound to its wire discriminator.
pub trait EventRecord: Record + Encode {
    const DISCRIMINATOR: &'static str;

    fn into_event(self) -> Event;
}

/// Fields every event carries; also the fallback shape for unknown events.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BaseEvent {
    pub kind: String,
    pub channel: String,
    pub connection_id: i64,
    pub data: DynamicValue,
}

crate::record!(BaseEvent {
    Type => kind,
    Channel => channel,
    ConnectionId => connection_id,
    Data => data,
});

macro_rules! event {
    ($(#[$meta:meta])* $name:ident => $variant:ident, $discriminator:literal) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Default, PartialEq)]
        pub struct $name {
            pub kind: String,
            pub channel: String,
            pub connection_id: i64,
        }

        crate::record!($name {
            Type => kind,
            Channel => channel,
            ConnectionId => connection_id,
        });

        impl EventRecord for $name {
            const DISCRIMINATOR: &'static str = $discriminator;

            fn into_event(self) -> Event {
                Event::$variant(self)
            }
        }
    };
    ($(#[$meta:meta])* $name:ident => $variant:ident, $discriminator:literal, $data:ty) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Default, PartialEq)]
        pub struct $name {
            pub kind: String,
            pub channel: String,
            pub connection_id: i64,
            pub data: $data,
        }

        crate::record!($name {
            Type => kind,
            Channel => channel,
            ConnectionId => connection_id,
            Data => data,
        });

        impl EventRecord for $name {
            const DISCRIMINATOR: &'static str = $discriminator;

            fn into_event(self) -> Event {
                Event::$variant(self)
            }
        }
    };
}

event!(
    /// Emitted locally to release a blocked `wait_event`.
    LibBreakEvent => LibBreak, "core$LibBreakEvent"
);
event!(LibConnectedEvent => LibConnected, "core$LibConnectedEvent");
event!(LibDisconnectedEvent => LibDisconnected, "core$LibDisconnectedEvent");
event!(
    LibPlatformDisconnectedEvent => LibPlatformDisconnected,
    "core$LibPlatformDisconnectedEvent"
);
event!(ThreadCreatedEvent => ThreadCreated, "thread$ThreadCreatedEvent", Thread);
event!(ThreadUpdatedEvent => ThreadUpdated, "thread$ThreadUpdatedEvent", Thread);
event!(
    ThreadDeletedEvent => ThreadDeleted,
    "thread$ThreadDeletedEvent",
    ThreadDeletedEventData
);
event!(ThreadNewMessageEvent => ThreadNewMessage, "thread$ThreadNewMessageEvent", Message);
event!(
    ThreadMessageDeletedEvent => ThreadMessageDeleted,
    "thread$ThreadMessageDeletedEvent",
    ThreadDeletedMessageEventData
);

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ThreadDeletedEventData {
    pub thread_id: String,
}

crate::record!(ThreadDeletedEventData {
    ThreadId => thread_id,
});

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ThreadDeletedMessageEventData {
    pub thread_id: String,
    pub message_id: String,
}

crate::record!(ThreadDeletedMessageEventData {
    ThreadId => thread_id,
    MessageId => message_id,
});

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    LibBreak(LibBreakEvent),
    LibConnected(LibConnectedEvent),
    LibDisconnected(LibDisconnectedEvent),
    LibPlatformDisconnected(LibPlatformDisconnectedEvent),
    ThreadCreated(ThreadCreatedEvent),
    ThreadUpdated(ThreadUpdatedEvent),
    ThreadDeleted(ThreadDeletedEvent),
    ThreadNewMessage(ThreadNewMessageEvent),
    ThreadMessageDeleted(ThreadMessageDeletedEvent),
    Unknown(BaseEvent),
}

impl Default for Event {
    fn default() -> Self {
        Event::Unknown(BaseEvent::default())
    }
}

impl Event {
    /// Discriminator of the concrete variant; `None` for `Unknown`.
    pub fn discriminator(&self) -> Option<&'static str> {
        match self {
            Event::LibBreak(_) => Some(LibBreakEvent::DISCRIMINATOR),
            Event::LibConnected(_) => Some(LibConnectedEvent::DISCRIMINATOR),
            Event::LibDisconnected(_) => Some(LibDisconnectedEvent::DISCRIMINATOR),
            Event::LibPlatformDisconnected(_) => Some(LibPlatformDisconnectedEvent::DISCRIMINATOR),
            Event::ThreadCreated(_) => Some(ThreadCreatedEvent::DISCRIMINATOR),
            Event::ThreadUpdated(_) => Some(ThreadUpdatedEvent::DISCRIMINATOR),
            Event::ThreadDeleted(_) => Some(ThreadDeletedEvent::DISCRIMINATOR),
            Event::ThreadNewMessage(_) => Some(ThreadNewMessageEvent::DISCRIMINATOR),
            Event::ThreadMessageDeleted(_) => Some(ThreadMessageDeletedEvent::DISCRIMINATOR),
            Event::Unknown(_) => None,
        }
    }

    pub fn is_break(&self) -> bool {
        matches!(self, Event::LibBreak(_))
    }

    pub fn channel(&self) -> &str {
        match self {
            Event::LibBreak(e) => &e.channel,
            Event::LibConnected(e) => &e.channel,
            Event::LibDisconnected(e) => &e.channel,
            Event::LibPlatformDisconnected(e) => &e.channel,
            Event::ThreadCreated(e) => &e.channel,
            Event::ThreadUpdated(e) => &e.channel,
            Event::ThreadDeleted(e) => &e.channel,
            Event::ThreadNewMessage(e) => &e.channel,
            Event::ThreadMessageDeleted(e) => &e.channel,
            Event::Unknown(e) => &e.channel,
        }
    }

    pub fn connection_id(&self) -> i64 {
        match self {
            Event::LibBreak(e) => e.connection_id,
            Event::LibConnected(e) => e.connection_id,
            Event::LibDisconnected(e) => e.connection_id,
            Event::LibPlatformDisconnected(e) => e.connection_id,
            Event::ThreadCreated(e) => e.connection_id,
            Event::ThreadUpdated(e) => e.connection_id,
            Event::ThreadDeleted(e) => e.connection_id,
            Event::ThreadNewMessage(e) => e.connection_id,
            Event::ThreadMessageDeleted(e) => e.connection_id,
            Event::Unknown(e) => e.connection_id,
        }
    }
}

/// Encodes `event` with its discriminator as the first object entry.
pub fn tagged<E: EventRecord>(event: &E) -> DynamicValue {
    let mut value = event.encode();
    if let DynamicValue::Object(entries) = &mut value {
        entries.insert(0, (TYPE_KEY.to_string(), DynamicValue::string(E::DISCRIMINATOR)));
    }
    value
}

impl Encode for Event {
    fn encode(&self) -> DynamicValue {
        match self {
            Event::LibBreak(e) => tagged(e),
            Event::LibConnected(e) => tagged(e),
            Event::LibDisconnected(e) => tagged(e),
            Event::LibPlatformDisconnected(e) => tagged(e),
            Event::ThreadCreated(e) => tagged(e),
            Event::ThreadUpdated(e) => tagged(e),
            Event::ThreadDeleted(e) => tagged(e),
            Event::ThreadNewMessage(e) => tagged(e),
            Event::ThreadMessageDeleted(e) => tagged(e),
            Event::Unknown(e) => e.encode(),
        }
    }
}

impl Decode for Event {
    fn from_value(value: &DynamicValue, cx: &DecodeContext<'_>) -> Result<Self, Error> {
        if let Some(tag) = discriminator(value) {
            match cx.registry::<Event>().and_then(|registry| registry.resolve(tag)) {
                Some(decoder) => return decoder(value, cx),
                None => debug!(discriminator = tag, "unregistered event type; decoding base shape"),
            }
        }
        decode_record::<BaseEvent>(value, cx).map(Event::Unknown)
    }
}

pub fn decode_event<E: EventRecord>(
    value: &DynamicValue,
    cx: &DecodeContext<'_>,
) -> Result<Event, Error> {
    decode_record::<E>(value, cx).map(E::into_event)
}

pub const BUILTIN_EVENTS: &[(&str, EventDecoder)] = &[
    (LibBreakEvent::DISCRIMINATOR, decode_event::<LibBreakEvent>),
    (LibConnectedEvent::DISCRIMINATOR, decode_event::<LibConnectedEvent>),
    (LibDisconnectedEvent::DISCRIMINATOR, decode_event::<LibDisconnectedEvent>),
    (
        LibPlatformDisconnectedEvent::DISCRIMINATOR,
        decode_event::<LibPlatformDisconnectedEvent>,
    ),
    (ThreadCreatedEvent::DISCRIMINATOR, decode_event::<ThreadCreatedEvent>),
    (ThreadUpdatedEvent::DISCRIMINATOR, decode_event::<ThreadUpdatedEvent>),
    (ThreadDeletedEvent::DISCRIMINATOR, decode_event::<ThreadDeletedEvent>),
    (ThreadNewMessageEvent::DISCRIMINATOR, decode_event::<ThreadNewMessageEvent>),
    (
        ThreadMessageDeletedEvent::DISCRIMINATOR,
        decode_event::<ThreadMessageDeletedEvent>,
    ),
];

/// Registry holding every event type this crate models.
pub fn builtin_registry() -> EventRegistry {
    TypeRegistry::from_table(BUILTIN_EVENTS)
}

/// Process-wide builtin registry, built on first use.
pub fn shared_registry() -> Arc<EventRegistry> {
    static SHARED: OnceLock<Arc<EventRegistry>> = OnceLock::new();
    SHARED.get_or_init(|| Arc::new(builtin_registry())).clone()
}
