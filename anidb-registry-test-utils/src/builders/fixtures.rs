//! Captured-style raw replies, one per command kind
//!
//! Each constant is the full datagram text, header line included.

/// Two upcoming air dates; the second has an exact start and a finished run
pub const CALENDAR: &str = "297 CALENDAR\n6622|1251417600|0\n7100|1252000000|17\n";

pub const CALENDAR_EMPTY: &str = "397 CALENDAR EMPTY\n";

/// ED2K hash matching [`FILE`]
pub const FILE_ED2K: &str = "c646d82a184a33f4e4f98af39f29a044";

/// File size matching [`FILE`]
pub const FILE_SIZE: u64 = 233_647_104;

/// A file covering one episode fully and 30% of the next
pub const FILE: &str = "220 FILE\n572794|6107|99294|12|2723|99295,30|0|41|high|HDTV|japanese|english'german|Some notes<br />more|Show - 02 [Group].mkv|1|0|2|1239494400\n";

pub const NO_SUCH_FILE: &str = "320 NO SUCH FILE\n";

/// A FILE reply cut short after the episode cross-references
pub const FILE_TRUNCATED: &str = "220 FILE\n572794|6107|99294|12|2723|99295,30\n";

pub const EPISODE: &str =
    "240 EPISODE\n99294|6107|25|712|14|2|The Day It Began|Hajimari no Hi||1239494400|1\n";

pub const GROUP: &str = "250 GROUP\n7|700|10|3|30|Name|N|||||1104537600|0|0|1239494400|1239494400|8,1'9,2\n";

/// Two groups on anime 4896, the second with a special released
pub const GROUP_STATUS: &str =
    "225 GROUP STATUS\n1612|MDAN|1|9|784|2|1-9\n7887|Some Group|2|7|650|10|5,7\n";

pub const NO_GROUPS_FOUND: &str = "325 NO GROUPS FOUND\n";

pub const CREATOR: &str = "245 CREATOR\n718|宮崎駿|Miyazaki Hayao|1|1234.jpg||http://example.jp|Hayao_Miyazaki||1239494400\n";

pub const NO_SUCH_CREATOR: &str = "345 NO SUCH CREATOR\n";

pub const UPDATED: &str = "243 UPDATED\n1|3|1700003600|4896,6107,12\n";

pub const BANNED: &str = "555 BANNED\nLeech\n";

pub const LOGIN_FIRST: &str = "501 LOGIN FIRST\n";

pub const SERVER_BUSY: &str = "602 SERVER BUSY\n";

/// A well-formed reply code no command kind expects
pub const UNKNOWN_COMMAND: &str = "598 UNKNOWN COMMAND\n";
