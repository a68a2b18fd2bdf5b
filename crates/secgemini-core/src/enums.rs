//! String-valued protocol enums.
//!
//! Every enum keeps an `Other` variant so values introduced by newer servers
//! survive a decode/encode round trip unchanged.

/// Declares a string-backed wire enum with a lossless `Other` fallback.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
            /// A value this client does not know, kept verbatim.
            Other(String),
        }

        impl $name {
            /// Wire representation.
            pub fn as_str(&self) -> &str {
                match self {
                    $( Self::$variant => $wire, )+
                    Self::Other(value) => value,
                }
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                match value {
                    $( $wire => Self::$variant, )+
                    other => Self::Other(other.to_owned()),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let value = String::deserialize(deserializer)?;
                Ok(Self::from(value.as_str()))
            }
        }
    };
}

pub(crate) use wire_enum;

wire_enum! {
    /// Who produced a message.
    Role {
        /// The end user or the local client acting for them.
        User => "user",
        /// The remote agent.
        Agent => "agent",
        /// The service itself.
        System => "system",
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::User
    }
}

wire_enum! {
    /// What a message carries.
    MessageType {
        /// Final answer content.
        Result => "result",
        /// Source citation.
        Source => "source",
        /// Debug trace.
        Debug => "debug",
        /// Progress information.
        Info => "info",
        /// Error report.
        Error => "error",
        /// Model reasoning.
        Thinking => "thinking",
        /// Update of an earlier message.
        Update => "update",
        /// Deletion of an earlier message.
        Delete => "delete",
        /// The agent asks the user to confirm an action.
        ConfirmationRequest => "confirmation_request",
        /// The user answers a confirmation request.
        ConfirmationResponse => "confirmation_response",
        /// User query.
        Query => "query",
        /// The agent asks the client to run a local tool.
        LocalToolCall => "local_tool_call",
        /// The client answers a local tool call.
        LocalToolResult => "local_tool_result",
        /// Opens a group of related messages.
        GroupStart => "group_start",
        /// Closes a group of related messages.
        GroupEnd => "group_end",
    }
}

wire_enum! {
    /// Lifecycle marker of a message or session.
    State {
        /// Unset.
        Undefined => "undefined",
        /// Session or exchange start.
        Start => "start",
        /// Terminal marker; ends a stream.
        End => "end",
        /// A query is being submitted.
        Query => "query",
        /// The agent is running.
        RunningAgent => "running_agent",
        /// The agent finished.
        AgentDone => "agent_done",
        /// Code is being written.
        Coding => "coding",
        /// Code produced a result.
        CodeResult => "code_result",
        /// A tool is being called.
        CallingTool => "calling_tool",
        /// A tool returned.
        ToolResult => "tool_result",
        /// Output is being generated.
        Generating => "generating",
        /// The answer is being written.
        Answering => "answering",
        /// The model is reasoning.
        Thinking => "thinking",
        /// The model is planning.
        Planning => "planning",
        /// The model is reviewing.
        Reviewing => "reviewing",
        /// The model is reading the request.
        Understanding => "understanding",
        /// Retrieval in progress (the wire spelling is the server's).
        Retrieving => "retriving",
        /// Grounding in progress.
        Grounding => "grounding",
    }
}

impl Default for State {
    fn default() -> Self {
        Self::Start
    }
}

wire_enum! {
    /// Kind of feedback submitted for a session.
    FeedbackType {
        /// Scored user feedback.
        UserFeedback => "user_feedback",
        /// Free-text bug report.
        BugReport => "bug_report",
    }
}

wire_enum! {
    /// Account type of a user.
    UserType {
        /// Browser UI account.
        Ui => "ui",
        /// Regular API user.
        User => "user",
        /// Administrator.
        Admin => "admin",
        /// Internal system account.
        System => "system",
        /// Service account.
        Service => "service",
    }
}

impl Default for UserType {
    fn default() -> Self {
        Self::User
    }
}
