use quiz_core::model::AnswerRecord;

/// Append-only log of answered questions, in question order.
///
/// Holds at most one record per question of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerRecorder {
    records: Vec<AnswerRecord>,
    limit: usize,
}

impl AnswerRecorder {
    #[must_use]
    pub fn with_capacity(questions: usize) -> Self {
        Self {
            records: Vec::with_capacity(questions),
            limit: questions,
        }
    }

    /// Append a record; `None` once the log holds one record per question.
    pub(crate) fn append(&mut self, record: AnswerRecord) -> Option<&AnswerRecord> {
        if self.is_full() {
            return None;
        }
        self.records.push(record);
        self.records.last()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.records.len() >= self.limit
    }

    #[must_use]
    pub fn records(&self) -> &[AnswerRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<&AnswerRecord> {
        self.records.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::QuestionId;

    #[test]
    fn keeps_append_order() {
        let mut recorder = AnswerRecorder::with_capacity(2);
        assert!(recorder.is_empty());

        recorder.append(AnswerRecord::new(QuestionId::new(2), 0, false, 1));
        let last = *recorder
            .append(AnswerRecord::new(QuestionId::new(1), 1, true, 2))
            .unwrap();

        assert_eq!(last.question_id(), QuestionId::new(1));
        assert_eq!(recorder.len(), 2);
        let ids: Vec<_> = recorder.records().iter().map(AnswerRecord::question_id).collect();
        assert_eq!(ids, vec![QuestionId::new(2), QuestionId::new(1)]);
    }

    #[test]
    fn refuses_to_grow_past_question_count() {
        let mut recorder = AnswerRecorder::with_capacity(1);
        assert!(recorder.append(AnswerRecord::new(QuestionId::new(1), 0, true, 1)).is_some());
        assert!(recorder.is_full());

        assert!(recorder.append(AnswerRecord::new(QuestionId::new(2), 0, true, 1)).is_none());
        assert_eq!(recorder.len(), 1);
        assert_eq!(recorder.last().map(AnswerRecord::question_id), Some(QuestionId::new(1)));
    }
}
