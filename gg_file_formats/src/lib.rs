//! Readers and writers for the file formats of the ggpack ecosystem
//! (Thimbleweed Park, Delores, Return to Monkey Island).
//!
//! * [`ggdict`]: the binary key/value container both packs and savegames
//!   are built on, in its classic and monkey variants.
//! * [`ggpack`]: the streaming asset container with XOR-encrypted
//!   entries and an encrypted GGDict directory.
//! * [`savegame`]: XXTEA-encrypted savegame blobs with a checksum
//!   footer.
//! * [`texts`]: the text table and `@id` placeholder resolution.

pub mod ggdict;
pub mod ggpack;
pub mod savegame;
pub mod texts;
