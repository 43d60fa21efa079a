use isokeep_fetch::HttpError;
use isokeep_version::VersionError;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error(transparent)]
    Network(#[from] HttpError),

    #[error("failed to parse {what} from {location}: {detail}")]
    Parse {
        what: &'static str,
        location: String,
        detail: String,
    },

    #[error("no release or file found at {location} matching {pattern:?}")]
    NotFound { location: String, pattern: String },

    #[error("no candidate matches criteria {criteria}")]
    NoMatch { criteria: String },

    #[error("criteria {criteria} leave {count} candidates; narrow the configuration")]
    Ambiguous { criteria: String, count: usize },

    #[error("invalid pattern {pattern:?}: {source}")]
    BadPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("source has no mirrors configured")]
    NoMirrors,
}

impl SourceError {
    pub(crate) fn parse(what: &'static str, location: &str, detail: impl ToString) -> Self {
        SourceError::Parse {
            what,
            location: location.to_string(),
            detail: detail.to_string(),
        }
    }

    pub(crate) fn bad_version(location: &str, err: VersionError) -> Self {
        Self::parse("version", location, err)
    }
}
