//! Pipeline phases and their status texts.

/// The phases a link run moves through, in order. Each phase has its own
/// status text shown above the loading animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelinePhase {
    Processing,
    TryingAlternative,
    ConvertingSlideshow,
    Optimizing,
    Sending,
}

impl PipelinePhase {
    /// Status text for this phase. Only the first phase names the user.
    pub fn status_text(&self, presenter: Option<&str>) -> String {
        match self {
            Self::Processing => match presenter {
                Some(mention) => format!("Processing link from {mention}"),
                None => "Processing link...".to_string(),
            },
            Self::TryingAlternative => "Trying alternative download...".to_string(),
            Self::ConvertingSlideshow => "Converting slideshow to video...".to_string(),
            Self::Optimizing => "Optimizing video...".to_string(),
            Self::Sending => "Sending media...".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processing_text_with_presenter() {
        assert_eq!(
            PipelinePhase::Processing.status_text(Some("<b>Ann</b>")),
            "Processing link from <b>Ann</b>"
        );
        assert_eq!(
            PipelinePhase::Processing.status_text(None),
            "Processing link..."
        );
    }

    #[test]
    fn test_later_phases_ignore_presenter() {
        assert_eq!(
            PipelinePhase::Sending.status_text(Some("<b>Ann</b>")),
            "Sending media..."
        );
    }
}
