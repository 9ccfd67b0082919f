//! Purpose: Stable method ids for each native module's dispatch table.
//! Exports: One `#[repr(i32)]` enum per module, each implementing `NativeMethod`.
//! Role: Wire contract shared with `exec_<Module>` on the native side.
//! Invariants: Discriminant values never change; new methods are appended at the end.
use crate::core::channel::{NativeMethod, NativeModule};

macro_rules! methods {
    ($(#[$meta:meta])* $name:ident => $module:ident { $($variant:ident = $id:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[repr(i32)]
        #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
        pub enum $name {
            $($variant = $id),+
        }

        impl $name {
            pub fn from_id(id: i32) -> Option<Self> {
                match id {
                    $($id => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl NativeMethod for $name {
            const MODULE: NativeModule = NativeModule::$module;

            fn id(self) -> i32 {
                self as i32
            }
        }
    };
}

methods!(ConnectionMethod => Connection {
    Connect = 0,
    ConnectPublic = 1,
    GetConnectionId = 2,
    ListContexts = 3,
    ListContextUsers = 4,
    Disconnect = 5,
    SetCertsPath = 6,
});

methods!(ThreadApiMethod => ThreadApi {
    CreateThread = 0,
    UpdateThread = 1,
    DeleteThread = 2,
    GetThread = 3,
    ListThreads = 4,
    GetMessage = 5,
    ListMessages = 6,
    SendMessage = 7,
    DeleteMessage = 8,
    UpdateMessage = 9,
    SubscribeForThreadEvents = 10,
    UnsubscribeFromThreadEvents = 11,
    SubscribeForMessageEvents = 12,
    UnsubscribeFromMessageEvents = 13,
});

methods!(StoreApiMethod => StoreApi {
    CreateStore = 0,
    UpdateStore = 1,
    DeleteStore = 2,
    GetStore = 3,
    ListStores = 4,
    CreateFile = 5,
    UpdateFile = 6,
    UpdateFileMeta = 7,
    WriteToFile = 8,
    DeleteFile = 9,
    GetFile = 10,
    ListFiles = 11,
    OpenFile = 12,
    ReadFromFile = 13,
    SeekInFile = 14,
    CloseFile = 15,
    SubscribeForStoreEvents = 16,
    UnsubscribeFromStoreEvents = 17,
    SubscribeForFileEvents = 18,
    UnsubscribeFromFileEvents = 19,
});

methods!(CryptoApiMethod => CryptoApi {
    SignData = 0,
    VerifySignature = 1,
    GeneratePrivateKey = 2,
    DerivePrivateKey = 3,
    DerivePrivateKey2 = 4,
    DerivePublicKey = 5,
    GenerateKeySymmetric = 6,
    EncryptDataSymmetric = 7,
    DecryptDataSymmetric = 8,
    ConvertPemKeyToWifKey = 9,
});

methods!(InboxApiMethod => InboxApi {
    CreateInbox = 0,
    UpdateInbox = 1,
    GetInbox = 2,
    ListInboxes = 3,
    GetInboxPublicView = 4,
    DeleteInbox = 5,
    PrepareEntry = 6,
    SendEntry = 7,
    ReadEntry = 8,
    ListEntries = 9,
    DeleteEntry = 10,
    CreateFileHandle = 11,
    WriteToFile = 12,
    OpenFile = 13,
    ReadFromFile = 14,
    SeekInFile = 15,
    CloseFile = 16,
    SubscribeForInboxEvents = 17,
    UnsubscribeFromInboxEvents = 18,
    SubscribeForEntryEvents = 19,
    UnsubscribeFromEntryEvents = 20,
});

methods!(EventQueueMethod => EventQueue {
    WaitEvent = 0,
    GetEvent = 1,
    EmitBreakEvent = 2,
});

methods!(BackendRequesterMethod => BackendRequester {
    BackendRequest = 0,
    BackendRequestWithToken = 1,
    BackendRequestWithKey = 2,
});
