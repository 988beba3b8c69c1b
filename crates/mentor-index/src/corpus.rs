use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::IndexError;

pub const UNKNOWN_METADATA: &str = "Unknown";

/// One row of the corpus backing the vector index. Row `i` of the corpus
/// pairs with row `i` of the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurriculumChunk {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesson: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter: Option<String>,
}

impl CurriculumChunk {
    pub fn lesson_or_unknown(&self) -> &str {
        non_blank(self.lesson.as_deref()).unwrap_or(UNKNOWN_METADATA)
    }

    pub fn chapter_or_unknown(&self) -> &str {
        non_blank(self.chapter.as_deref()).unwrap_or(UNKNOWN_METADATA)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CorpusFile {
    Chunks(Vec<CurriculumChunk>),
    Course(CourseDocument),
}

#[derive(Debug, Deserialize)]
struct CourseDocument {
    chapters: Vec<CourseChapter>,
}

#[derive(Debug, Deserialize)]
struct CourseChapter {
    #[serde(default)]
    chapter_title: String,
    #[serde(default)]
    lessons: Vec<CourseLesson>,
}

#[derive(Debug, Deserialize)]
struct CourseLesson {
    #[serde(default)]
    lesson_title: String,
    #[serde(default)]
    content: String,
}

pub fn load_corpus(path: impl AsRef<Path>) -> Result<Vec<CurriculumChunk>, IndexError> {
    let bytes = fs::read(path.as_ref())?;
    parse_corpus(&bytes)
}

/// Accepts either a flat array of chunks or a nested course document whose
/// lessons each become one chunk.
pub fn parse_corpus(bytes: &[u8]) -> Result<Vec<CurriculumChunk>, IndexError> {
    let parsed: CorpusFile = serde_json::from_slice(bytes)?;
    Ok(match parsed {
        CorpusFile::Chunks(chunks) => chunks,
        CorpusFile::Course(course) => flatten_course(course),
    })
}

fn flatten_course(course: CourseDocument) -> Vec<CurriculumChunk> {
    let mut chunks = Vec::new();
    for chapter in course.chapters {
        for lesson in chapter.lessons {
            let text = format!(
                "Chapter: {}\nLesson: {}\nContent: {}",
                chapter.chapter_title, lesson.lesson_title, lesson.content
            );
            chunks.push(CurriculumChunk {
                text,
                lesson: Some(lesson.lesson_title),
                chapter: Some(chapter.chapter_title.clone()),
            });
        }
    }
    chunks
}
