use serde::Serialize;

/// A canned question/answer pair with the keywords that select it.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct FaqEntry {
    pub id: u32,
    pub question: &'static str,
    pub answer: &'static str,
    pub keywords: &'static [&'static str],
}

/// Suggested first questions offered before the user types anything.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct QuickAction {
    pub text: &'static str,
}

pub const QUICK_ACTIONS: &[QuickAction] = &[
    QuickAction {
        text: "How to upload documents?",
    },
    QuickAction {
        text: "Required documents",
    },
    QuickAction { text: "File formats" },
    QuickAction { text: "Review time" },
];

pub const GREETING: &str = "Hello! I'm here to help you with document uploads and compliance questions. How can I assist you today?";

pub const FALLBACK_ANSWER: &str = "I'm sorry, I don't have a specific answer for that question. Here are some common topics I can help with:\n\n\u{2022} Document upload process\n\u{2022} Required documents\n\u{2022} File formats and requirements\n\u{2022} Review timelines\n\u{2022} Compliance status\n\nYou can also contact HR for personalized assistance.";

/// Order matters: ties are resolved in favour of the earlier entry.
pub const KNOWLEDGE_BASE: &[FaqEntry] = &[
    FaqEntry {
        id: 1,
        question: "How do I upload documents?",
        answer: "To upload documents, go to the 'Upload Documents' tab in your dashboard. Select the document category, choose your file (PDF, JPEG, or PNG), add an optional description, and click 'Upload Document'. Your document will be sent for HR review.",
        keywords: &["upload", "document", "file", "how"],
    },
    FaqEntry {
        id: 2,
        question: "Which documents are required?",
        answer: "All employees must submit the following documents: 1) ID Proof, 2) Medical Certificate, 3) Training Certificate, and 4) Safety Training Certificate. These are mandatory for compliance.",
        keywords: &["required", "documents", "mandatory", "which", "what"],
    },
    FaqEntry {
        id: 3,
        question: "What file formats are supported?",
        answer: "We accept PDF, JPEG, and PNG files. The maximum file size is 10MB. Please ensure your documents are clear and readable.",
        keywords: &["format", "file", "type", "pdf", "jpeg", "png", "size"],
    },
    FaqEntry {
        id: 4,
        question: "How long does document review take?",
        answer: "Document review typically takes 2-3 business days. You'll see the status change from 'Pending' to 'Approved' or 'Rejected' in your dashboard. You'll also receive notifications about status changes.",
        keywords: &["review", "time", "long", "approval", "pending"],
    },
    FaqEntry {
        id: 5,
        question: "What if my document is rejected?",
        answer: "If your document is rejected, you can upload a new version. Check the rejection reason and ensure your new document meets all requirements. Common reasons include poor image quality, expired documents, or incorrect document type.",
        keywords: &["rejected", "rejection", "reupload", "denied"],
    },
    FaqEntry {
        id: 6,
        question: "How do I check my compliance status?",
        answer: "Your compliance status is displayed on your dashboard. You can see which documents are approved, pending, or rejected. The compliance percentage shows your overall progress.",
        keywords: &["status", "compliance", "check", "progress"],
    },
    FaqEntry {
        id: 7,
        question: "Can I update my profile information?",
        answer: "Currently, profile updates need to be requested through HR. Contact your HR representative to update your name, email, or role information.",
        keywords: &["profile", "update", "change", "information"],
    },
    FaqEntry {
        id: 8,
        question: "Who can I contact for help?",
        answer: "For technical issues, contact IT support. For document-related questions or compliance issues, contact your HR representative. Emergency contacts are available in the company directory.",
        keywords: &["help", "contact", "support", "assistance"],
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_and_ordered() {
        let ids: Vec<u32> = KNOWLEDGE_BASE.iter().map(|e| e.id).collect();
        assert_eq!(ids, (1..=8).collect::<Vec<_>>());
    }

    #[test]
    fn test_keywords_are_lowercase() {
        for entry in KNOWLEDGE_BASE {
            for kw in entry.keywords {
                assert_eq!(*kw, kw.to_lowercase(), "entry {} keyword {kw}", entry.id);
            }
        }
    }
}
