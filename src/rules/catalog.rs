// src/rules/catalog.rs - Built-in ESXi log types
//
// Patterns are tried top to bottom within a log type. Several entries may
// share one line regex and differ only in the description filter that
// decides the access type.

use super::{AccessType, DescriptionHandler, LogTypeDef, PatternDef, TimestampLayout};

/// Every ESXi daemon writes ISO 8601 UTC timestamps, optionally with fractions
pub const ESXI_TIMESTAMPS: &[TimestampLayout] = &[
    TimestampLayout::Naive("%Y-%m-%dT%H:%M:%S%.fZ"),
    TimestampLayout::Offset("%Y-%m-%dT%H:%M:%S%.f%:z"),
    TimestampLayout::Naive("%Y-%m-%dT%H:%M:%S%.f"),
];

// (?P<Timestamp>...) shared by all line regexes below
macro_rules! ts {
    () => {
        r"(?P<Timestamp>\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d+)?(?:Z|[+-]\d{2}:?\d{2})?)"
    };
}

const fn verbatim(label: &'static str, timeline: bool) -> AccessType {
    AccessType::new(label, DescriptionHandler::Verbatim { timeline })
}

const fn attributed(label: &'static str, actor: &'static str, timeline: bool) -> AccessType {
    AccessType::new(label, DescriptionHandler::Attributed { actor, timeline })
}

const fn tagged(label: &'static str, tag: &'static str, timeline: bool) -> AccessType {
    AccessType::new(label, DescriptionHandler::Tagged { tag, timeline })
}

const fn pattern(
    regex: &'static str,
    description_filter: Option<&'static str>,
    access_type: AccessType,
) -> PatternDef {
    PatternDef {
        regex,
        description_filter,
        access_type,
    }
}

const HOSTD_LINE: &str = concat!(
    "(?i)",
    ts!(),
    r" (?P<Log_Level>\w+\(.*?\)|\w+) (?P<Event_ID>hostd\[\d{0,9}\])[: ](?P<Event_Type_ID>.*?):\s*(?P<Description>.*)"
);

const SYSLOG_LINE: &str = concat!(
    "(?i)",
    ts!(),
    r"(?: \w+\(.*?\) | )(?P<Logon_Type>sftp-server.*?|DCUI.*?):\s*(?P<Description>.*)"
);

const SHELL_LINE: &str = concat!(
    "(?i)",
    ts!(),
    r"(?: \w+\(.*?\) | )(?P<Logon_Type>[a-zA-Z].*?):\s*(?P<Description>.*)"
);

const AUTH_LINE: &str = concat!(
    "(?i)",
    ts!(),
    r"(?: \w+\(.*?\) | )(?P<Logon_ID>\w+\[\d+\]):(?:.*?:)*\s*(?P<Description>.*)"
);

const VMAUTHD_LINE: &str = concat!(
    "(?i)",
    ts!(),
    r"(?: \w+\(.*?\) | |: )(?P<Logon_ID>vmauthd.*?):\s*(?P<Description>.*)"
);

const VMKERNEL_EXEC_LINE: &str = concat!(
    "(?i)",
    ts!(),
    r"\s.*?(?P<Description>\S*sh: exec denied.*)"
);

const VMKERNEL_CONNECTION_LINE: &str = concat!(
    "(?i)",
    ts!(),
    r"\s.*?(?P<Description>Accepted connection from.*|Error reading from pending connection:.*)"
);

const VOBD_LINE: &str = concat!(
    "(?i)",
    ts!(),
    r"(?: \w+\(.*?\) vobd\[.*?\]:  |: )(?P<Type>\[.*?\]) (?P<ID>\d+.*?):\s*(?P<Description_Type>\[.*?\]) (?P<Description>.*)"
);

const ESXCLI_LINE: &str = concat!(
    "(?i)",
    ts!(),
    r" (?P<Log_Level>\w+\(.*?\)\[.*?\]|\w+\(.*?\)|\w+) (?:esxcli\[.*?\]:\s\s|esxcli\[.*?\]: |esxcli\[.*?\] )(?P<Type>[^:]+):\s*(?P<Description>.*)"
);

const RHTTPPROXY_LINE: &str = concat!(
    "(?i)",
    ts!(),
    r" (?P<Log_Level>\w+) (?P<Log_ID>rhttpproxy\[\d+\]) (?P<Description_Type>\[.*?\]) (?P<Description>.*)"
);

pub const ESXI_LOG_TYPES: &[LogTypeDef] = &[
    LogTypeDef {
        name: "hostd",
        filename_pattern: r"hostd\.(log|\d+\.gz|log\..*)",
        timestamp_layouts: ESXI_TIMESTAMPS,
        patterns: &[
            pattern(
                HOSTD_LINE,
                Some(r"(?i)SSH access has been|Accepted password for user|User .*@\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}|SSH session was"),
                verbatim("Logon", true),
            ),
            pattern(
                HOSTD_LINE,
                Some(r"(?i)Account.* was created|Got HTTP|File upload to path|File download from path|The ESXi command line shell|file delete|Deletion of file or directory|DatastoreBrowserImpl::SearchInt.*dsPath:|Create requested for|Login password for user.* has been changed|Password was changed for account"),
                verbatim("User_activity", true),
            ),
            pattern(
                HOSTD_LINE,
                Some(r"(?i)Account.* was updated on host|Sent OK response for"),
                verbatim("User_activity", false),
            ),
        ],
    },
    LogTypeDef {
        name: "syslog",
        filename_pattern: r"syslog\.(log|\d+\.gz|log\..*)",
        timestamp_layouts: ESXI_TIMESTAMPS,
        patterns: &[
            pattern(
                SYSLOG_LINE,
                Some(r"User [a-zA-Z0-9].* logged"),
                attributed("Logon", "Logon_Type", true),
            ),
            pattern(
                SYSLOG_LINE,
                Some(r"session"),
                attributed("Logon", "Logon_Type", false),
            ),
            pattern(
                SYSLOG_LINE,
                Some(r"password changed for|Login password for user"),
                attributed("User_activity", "Logon_Type", true),
            ),
            pattern(
                SYSLOG_LINE,
                Some(r#"(?i)opendir|closedir|open "|close "|sent status"#),
                attributed("User_activity", "Logon_Type", false),
            ),
        ],
    },
    LogTypeDef {
        name: "shell",
        filename_pattern: r"shell\.(log|\d+\.gz|log\..*)",
        timestamp_layouts: ESXI_TIMESTAMPS,
        patterns: &[pattern(
            SHELL_LINE,
            None,
            attributed("Bash_activity", "Logon_Type", true),
        )],
    },
    LogTypeDef {
        name: "auth",
        filename_pattern: r"auth\.(log|\d+\.gz|log\..*)",
        timestamp_layouts: ESXI_TIMESTAMPS,
        patterns: &[
            pattern(
                AUTH_LINE,
                Some(r"(?i)user [a-zA-Z0-9].* login|Accepted keyboard-interactive|Connection from|Session opened for|Session closed for"),
                attributed("Logon", "Logon_ID", true),
            ),
            pattern(
                AUTH_LINE,
                Some(r"(?i)authentication failure;|Connection closed by|error \[login"),
                attributed("Logon", "Logon_ID", false),
            ),
            pattern(
                AUTH_LINE,
                Some(r"(?i)password changed"),
                attributed("User_activity", "Logon_ID", true),
            ),
        ],
    },
    LogTypeDef {
        name: "vmauthd",
        filename_pattern: r"vmauthd\.(log|\d+\.gz|log\..*)",
        timestamp_layouts: ESXI_TIMESTAMPS,
        patterns: &[pattern(
            VMAUTHD_LINE,
            Some(r"Connect from remote socket"),
            attributed("Remote_access", "Logon_ID", false),
        )],
    },
    LogTypeDef {
        name: "vmkernel",
        filename_pattern: r"vmkernel\.(log|\d+\.gz|log\..*)",
        timestamp_layouts: ESXI_TIMESTAMPS,
        patterns: &[
            pattern(
                VMKERNEL_EXEC_LINE,
                None,
                verbatim("Execution_denied", true),
            ),
            pattern(
                VMKERNEL_CONNECTION_LINE,
                None,
                verbatim("Remote_access", false),
            ),
        ],
    },
    LogTypeDef {
        name: "vobd",
        filename_pattern: r"vobd\.(log|\d+\.gz|log\..*)",
        timestamp_layouts: ESXI_TIMESTAMPS,
        patterns: &[
            pattern(
                VOBD_LINE,
                Some(r"(?i)SSH session was|Authentication of user.* has"),
                tagged("Logon", "Description_Type", true),
            ),
            pattern(
                VOBD_LINE,
                Some(r"(?i)The ESX command line shell has been|Administrator access to the host has been|Login password for user|SSH access has been"),
                tagged("User_activity", "Description_Type", true),
            ),
        ],
    },
    LogTypeDef {
        name: "esxcli",
        filename_pattern: r"esxcli\.(log|\d+\.gz|log\..*)",
        timestamp_layouts: ESXI_TIMESTAMPS,
        patterns: &[pattern(
            ESXCLI_LINE,
            None,
            attributed("User_activity", "Type", true),
        )],
    },
    LogTypeDef {
        name: "rhttpproxy",
        filename_pattern: r"rhttpproxy\.(log|\d+\.gz|log\..*)",
        timestamp_layouts: ESXI_TIMESTAMPS,
        patterns: &[pattern(
            RHTTPPROXY_LINE,
            Some(r"New proxy client"),
            verbatim("Remote_access", false),
        )],
    },
];
