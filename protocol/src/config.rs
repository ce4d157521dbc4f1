//! # Protocol Configuration & Constants
//!
//! Every magic number in the Lea wire format lives here. If you're
//! hardcoding a constant somewhere else, you're doing it wrong and you
//! owe the team coffee.
//!
//! These values are consensus-critical: every node on the network decodes
//! transactions against the same tags, caps, and domain strings. Changing
//! any of them invalidates every signature ever produced, so don't.

// ---------------------------------------------------------------------------
// Wire Format
// ---------------------------------------------------------------------------

/// Wire format version. The first unsigned varint of every transaction
/// payload. Decoders reject anything else — there is no version
/// negotiation for signed bytes.
pub const WIRE_VERSION: u128 = 1;

/// Hard cap on the total decoded size of a transaction, in bytes.
/// 1 MiB is generous for a client-built transaction and small enough that
/// a malicious length prefix can't make the decoder allocate the moon.
pub const MAX_TX_SIZE_BYTES: usize = 1024 * 1024;

/// Maximum declared length of a large TVF vector. Checked *before* any
/// allocation happens.
pub const MAX_VECTOR_LEN: usize = 1 << 20;

/// Maximum payload length encodable in a small-vector header
/// (`(len << 2) | 0b10` leaves six bits for the length).
pub const MAX_SMALL_VECTOR_LEN: usize = 63;

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

/// Byte repeated 32 times to form the default pod when a manifest does
/// not name one. The pod is the routing prefix that tells the chain which
/// on-chain decoder should interpret the transaction body.
pub const DEFAULT_POD_BYTE: u8 = 0x11;

/// Length of a pod, an address, and every hash in this protocol.
pub const ADDRESS_LENGTH: usize = 32;

// ---------------------------------------------------------------------------
// Addresses
// ---------------------------------------------------------------------------

/// Bech32m human-readable prefix for Lea addresses. Short enough to type,
/// long enough to be unambiguous.
pub const ADDRESS_HRP: &str = "lea";

// ---------------------------------------------------------------------------
// Chained Signing
// ---------------------------------------------------------------------------

/// Domain-separation tag for chained transaction signatures: the 10 ASCII
/// bytes of `TX-LINK-V1` followed by 22 zero bytes. Fixed forever — a
/// different tag means a different (incompatible) signing domain.
pub const DOMAIN_TX_LINK_V1: [u8; 32] =
    *b"TX-LINK-V1\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0";

// ---------------------------------------------------------------------------
// VM Wrapper
// ---------------------------------------------------------------------------

/// Magic bytes of the optional VM envelope some runtimes prepend:
/// `"LEAB" ‖ version ‖ u64-LE length ‖ transaction`.
pub const VM_MAGIC: [u8; 4] = *b"LEAB";

/// VM envelope version byte. Only 0x01 exists.
pub const VM_VERSION: u8 = 0x01;

/// Total size of the VM envelope header: magic + version + length field.
pub const VM_HEADER_LEN: usize = 4 + 1 + 8;

// ---------------------------------------------------------------------------
// Pubset Markers
// ---------------------------------------------------------------------------

/// Algorithm marker preceding the Ed25519 public key inside a serialized
/// pubset. Reserved — decoders reject anything else in that slot.
pub const PUBSET_MARKER_ED25519: u128 = 0;

/// Algorithm marker preceding the Falcon-512 public key inside a
/// serialized pubset. Reserved.
pub const PUBSET_MARKER_FALCON512: u128 = 1;
