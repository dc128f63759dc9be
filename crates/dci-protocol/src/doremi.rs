//! Built-in Doremi DCP-2000 command table.

use crate::message::{CommandDefinition, Field, FieldKind, Parameter, ParameterKind};

const STORAGE: &[(u64, &str)] = &[(1, "local"), (2, "remote"), (3, "local+remote")];

const CONTENT_KIND: &[(u64, &str)] = &[
    (0, "Unknown"),
    (1, "Feature"),
    (2, "Trailer"),
    (3, "Test"),
    (4, "Teaser"),
    (5, "Rating"),
    (6, "Advertisement"),
    (7, "Short"),
    (8, "Transitional"),
    (9, "PSA"),
    (10, "Policy"),
    (128, "Live CPL"),
];

const ESSENCE_ENCODING: &[(u64, &str)] = &[
    (0, "Unknown"),
    (1, "MPEG2"),
    (2, "JPEG2000"),
    (3, "Audio PCM"),
];

const ENCRYPTION: &[(u64, &str)] = &[(0, "No Encryption"), (1, "AES 128 CBC")];

const UUID_LIST_RESPONSE: &[Field] = &[
    Field::new("amount", 0, Some(4), FieldKind::UInt),
    Field::new("item_length", 4, Some(8), FieldKind::UInt),
    Field::new("list", 0, Some(-1), FieldKind::UuidList),
    Field::new("response", -1, None, FieldKind::UInt),
];

const CPL_INFO_PARAMETERS: &[Parameter] = &[Parameter::new("uuid", ParameterKind::Uuid)];

const CPL_INFO_RESPONSE: &[Field] = &[
    Field::new("cpl_uuid", 0, Some(16), FieldKind::Uuid),
    Field::new("storage", 16, Some(17), FieldKind::UInt).with_labels(STORAGE),
    Field::new("content_title_text", 17, Some(145), FieldKind::Text),
    Field::new("content_kind", 145, Some(146), FieldKind::UInt).with_labels(CONTENT_KIND),
    Field::new("duration", 146, Some(150), FieldKind::UInt),
    Field::new("edit_rate_a", 150, Some(154), FieldKind::UInt),
    Field::new("edit_rate_b", 154, Some(158), FieldKind::UInt),
    Field::new("picture_encoding", 158, Some(159), FieldKind::UInt).with_labels(ESSENCE_ENCODING),
    Field::new("picture_width", 159, Some(161), FieldKind::UInt),
    Field::new("picture_height", 161, Some(163), FieldKind::UInt),
    Field::new("picture_encryption", 163, Some(164), FieldKind::UInt).with_labels(ENCRYPTION),
    Field::new("sound_encoding", 164, Some(165), FieldKind::UInt).with_labels(ESSENCE_ENCODING),
    Field::new("sound_channel_count", 165, Some(166), FieldKind::UInt),
    Field::new("sound_quantization_bits", 166, Some(167), FieldKind::UInt),
    Field::new("sound_encryption", 167, Some(168), FieldKind::UInt).with_labels(ENCRYPTION),
    Field::new("crypto_key_id_list", 176, Some(-1), FieldKind::UuidList),
    Field::new("response", -1, None, FieldKind::UInt),
];

/// Lists the compositions stored on the server.
pub const GET_CPL_LIST: CommandDefinition =
    CommandDefinition::new("GetCPLList", [0x01, 0x01, 0x00], [0x01, 0x02, 0x00])
        .with_fields(UUID_LIST_RESPONSE)
        .with_summary("List composition playlists stored on the server");

/// Lists the show playlists stored on the server.
pub const GET_SPL_LIST: CommandDefinition =
    CommandDefinition::new("GetSPLList", [0x03, 0x01, 0x00], [0x03, 0x02, 0x00])
        .with_fields(UUID_LIST_RESPONSE)
        .with_summary("List show playlists stored on the server");

/// Describes one composition.
pub const GET_CPL_INFO: CommandDefinition =
    CommandDefinition::new("GetCPLInfo", [0x01, 0x03, 0x00], [0x01, 0x04, 0x00])
        .with_parameters(CPL_INFO_PARAMETERS)
        .with_fields(CPL_INFO_RESPONSE)
        .with_summary("Show details of one composition playlist");

const BUILTIN: &[CommandDefinition] = &[GET_CPL_LIST, GET_SPL_LIST, GET_CPL_INFO];

/// Built-in command definitions in registration order.
#[must_use]
pub const fn builtin_commands() -> &'static [CommandDefinition] {
    BUILTIN
}
