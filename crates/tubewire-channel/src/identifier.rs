use serde::{Deserialize, Serialize};

use crate::beanstalk::beanstalk;
use crate::channel::Channel;
use crate::codec::{codec_by_name, DEFAULT_CODEC};
use crate::error::{ChannelError, CodecError, Result};

/// Where a resolve call happens.
///
/// No channel variant resolves relative to a context yet; passing one fails
/// with [`ChannelError::UnsupportedContext`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveContext {}

/// A serializable description of a channel's destination.
///
/// Serialized with a `kind` tag, e.g.
/// `{"kind":"beanstalk","url":"beanstalk://localhost:11300","tube":"jobs"}`.
/// A `codec` field is added only when the channel does not speak JSON.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[non_exhaustive]
pub enum Identifier {
    Beanstalk(BeanstalkIdentifier),
}

/// Endpoint, tube and codec of a queue-daemon channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BeanstalkIdentifier {
    pub url: String,
    pub tube: String,
    #[serde(default = "default_codec", skip_serializing_if = "is_default_codec")]
    pub codec: String,
}

fn default_codec() -> String {
    DEFAULT_CODEC.to_string()
}

fn is_default_codec(codec: &str) -> bool {
    codec == DEFAULT_CODEC
}

impl Identifier {
    /// A JSON-speaking queue-daemon destination.
    pub fn beanstalk(url: impl Into<String>, tube: impl Into<String>) -> Self {
        Self::beanstalk_with_codec(url, tube, DEFAULT_CODEC)
    }

    /// A queue-daemon destination whose messages use the named codec.
    pub fn beanstalk_with_codec(
        url: impl Into<String>,
        tube: impl Into<String>,
        codec: impl Into<String>,
    ) -> Self {
        Self::Beanstalk(BeanstalkIdentifier {
            url: url.into(),
            tube: tube.into(),
            codec: codec.into(),
        })
    }

    /// Reconstitute a channel handle for this destination.
    ///
    /// Every call opens its own connection, so two resolves give two
    /// independent handles onto the same destination. The handle uses the
    /// codec named by the identifier, which must be registered in this
    /// process (see [`register_codec`](crate::codec::register_codec)).
    pub fn resolve(&self, context: Option<&ResolveContext>) -> Result<Box<dyn Channel>> {
        if context.is_some() {
            return Err(ChannelError::UnsupportedContext);
        }
        match self {
            Identifier::Beanstalk(id) => {
                let codec = codec_by_name(&id.codec)
                    .ok_or_else(|| CodecError::UnknownCodec(id.codec.clone()))?;
                Ok(Box::new(beanstalk(&id.url, Some(&id.tube))?.with_codec(codec)))
            }
        }
    }
}
