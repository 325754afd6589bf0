//! Prompt assembly for the grounded and ungrounded paths.

use serde::{Deserialize, Serialize};

use crate::sources::merge_sources;
use crate::types::{Attribution, Passage};

pub const CONTEXT_SEPARATOR: &str = "\n\n---\n";

/// Behavioral directive shared by both paths: calm tone, Indonesian, no
/// diagnosis or prescription, escalate severe symptoms.
pub const BAYMAX_DIRECTIVE: &str = "Anda adalah Baymax, asisten kesehatan pribadi yang tenang dan empatik. \
Anda tidak mendiagnosis penyakit, tidak meresepkan obat, dan tidak memberikan rekomendasi medis yang bersifat spesifik. \
Tugas Anda adalah memberikan informasi umum, tips gaya hidup, dan pertolongan awal yang aman berdasarkan pertanyaan pengguna atau konteks yang diberikan. \
Jika pertanyaan berkaitan dengan gejala berat, Anda harus menyarankan untuk berkonsultasi langsung dengan tenaga medis atau layanan darurat. \
Tulislah jawaban dalam Bahasa Indonesia dengan 2–4 kalimat, kemudian berikan 2–3 bullet point saran jika relevan. \
Akhiri jawaban dengan pertanyaan singkat atau harapan baik.";

const GROUNDED_GUIDANCE: &str = "Gunakan informasi dari [KONTEKS] untuk menjawab pertanyaan. \
Jika konteks tidak relevan, berikan jawaban umum sesuai kebijaksanaan Anda. \
Selalu cantumkan bagian 'Sumber:' di akhir jawaban yang berisi nama lembaga, dipisahkan oleh koma, dari sumber yang digunakan. \
Jika Anda tidak dapat menemukan jawaban yang relevan atau yakin, katakan bahwa Anda tidak tahu dan sarankan untuk berkonsultasi dengan tenaga medis.";

const NO_CONTEXT_GUIDANCE: &str = "Tidak ada konteks dari basis pengetahuan untuk pertanyaan ini. \
Anda boleh menjawab dari pengetahuan umum, tetapi nyatakan dengan jelas bahwa jawaban tidak didukung sumber rujukan. \
Jika Anda tidak yakin, katakan bahwa Anda tidak tahu dan sarankan untuk berkonsultasi dengan tenaga medis.";

const CONTEXT_LABEL: &str = "[KONTEKS]";
const QUESTION_LABEL: &str = "[PERTANYAAN PENGGUNA]";
const GUIDANCE_LABEL: &str = "[PETUNJUK]";

/// Everything the generator sees on the grounded path, plus the citation list
/// returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundedPrompt {
    pub directive: String,
    /// Passage texts joined by [`CONTEXT_SEPARATOR`]; empty when nothing was retrieved.
    pub context: String,
    pub question: String,
    /// Deduplicated, sorted source names.
    pub sources: Vec<String>,
}

impl GroundedPrompt {
    pub fn has_context(&self) -> bool {
        !self.context.is_empty()
    }

    /// The single system-level instruction handed to the generator.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.directive.len() + self.context.len() + self.question.len() + 512);
        out.push_str(&self.directive);
        out.push_str("\n\n");
        if self.has_context() {
            out.push_str(CONTEXT_LABEL);
            out.push('\n');
            out.push_str(&self.context);
            out.push_str("\n\n");
        }
        out.push_str(QUESTION_LABEL);
        out.push('\n');
        out.push_str(&self.question);
        out.push_str("\n\n");
        out.push_str(GUIDANCE_LABEL);
        out.push('\n');
        if self.has_context() {
            out.push_str(GROUNDED_GUIDANCE);
            if !self.sources.is_empty() {
                out.push_str(" Sumber yang tersedia: ");
                out.push_str(&self.sources.join(", "));
                out.push('.');
            }
        } else {
            out.push_str(NO_CONTEXT_GUIDANCE);
        }
        out
    }
}

/// Builds the grounded prompt from ranked passages and their attributions.
pub fn assemble<'a, P, A>(question: &str, passages: P, attributions: A) -> GroundedPrompt
where
    P: IntoIterator<Item = &'a Passage>,
    A: IntoIterator<Item = &'a Attribution>,
{
    let context = passages.into_iter().map(|p| p.text.as_str()).collect::<Vec<_>>().join(CONTEXT_SEPARATOR);
    let sources = merge_sources(attributions.into_iter().map(|a| a.sources.as_str()));
    GroundedPrompt { directive: BAYMAX_DIRECTIVE.to_string(), context, question: question.to_string(), sources }
}

/// System prompt for the ungrounded chat path: the directive alone.
pub fn chat_directive() -> &'static str {
    BAYMAX_DIRECTIVE
}
