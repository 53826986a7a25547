use std::fmt::Write;

use classroom_core::model::{SlotState, SlotStatus};
use classroom_core::slots::Slot;
use services::DashboardSnapshot;

const NAME_WIDTH: usize = 16;
const CELL_WIDTH: usize = 9;

fn glyph(status: SlotStatus) -> Option<char> {
    match status {
        SlotStatus::Unanswered => None,
        SlotStatus::InProgress => Some('✎'),
        SlotStatus::Correct => Some('○'),
        SlotStatus::Wrong => Some('×'),
    }
}

fn cell(state: &SlotState) -> String {
    match glyph(state.status) {
        Some(mark) => format!("{mark} {:.0}%", state.progress.round()),
        None => String::new(),
    }
}

fn column_label(snapshot: &DashboardSnapshot, slot: Slot) -> String {
    match snapshot.slots.iter().find(|(mapped, _)| *mapped == slot) {
        Some((_, question)) => format!("{slot}#{question}"),
        None => slot.to_string(),
    }
}

/// Header, one row per student and a per-slot summary footer.
pub fn render(snapshot: &DashboardSnapshot) -> String {
    let mut out = String::new();
    let theme = snapshot
        .theme_id
        .map_or_else(|| "-".to_string(), |theme| theme.to_string());
    let _ = writeln!(
        out,
        "Lesson {}  theme {}  {}  {}",
        snapshot.lesson_id,
        theme,
        snapshot.timer.display(),
        snapshot.phase.message()
    );
    if snapshot.clock_offset_ms != 0 {
        let _ = writeln!(out, "server clock offset {} ms", snapshot.clock_offset_ms);
    }
    out.push('\n');

    let _ = write!(out, "{:>3}  {:<NAME_WIDTH$}", "No", "Name");
    for slot in Slot::ALL {
        let _ = write!(out, "{:<CELL_WIDTH$}", column_label(snapshot, slot));
    }
    out.push('\n');

    for student in &snapshot.students {
        let _ = write!(out, "{:>3}  {:<NAME_WIDTH$}", student.number(), student.name());
        for (_, state) in student.slots() {
            let _ = write!(out, "{:<CELL_WIDTH$}", cell(state));
        }
        out.push('\n');
    }

    let _ = write!(out, "{:>3}  {:<NAME_WIDTH$}", "", "Correct rate");
    for summary in &snapshot.summaries {
        let rate = format!("{:.0}%", summary.correct_rate().round());
        let _ = write!(out, "{rate:<CELL_WIDTH$}");
    }
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use classroom_core::ServerClock;
    use classroom_core::model::{AnswerRecord, ClassId, LessonId, QuestionId, RosterEntry, StudentId};
    use classroom_core::progress::ExerciseDuration;
    use classroom_core::time::{FIXED_TEST_TIMESTAMP, fixed_clock};
    use services::{DashboardState, MergeMode};

    const NOW: i64 = FIXED_TEST_TIMESTAMP;

    fn snapshot() -> DashboardSnapshot {
        let lesson = LessonId::new(4);
        let mut state = DashboardState::new(
            lesson,
            ServerClock::new(fixed_clock()),
            ExerciseDuration::default(),
        );
        let roster: Vec<_> = [(1, "Aiko"), (2, "Bram")]
            .into_iter()
            .map(|(id, name)| RosterEntry {
                student_id: StudentId::new(id),
                name: name.to_string(),
                class_id: ClassId::new(1),
                students_number: u32::try_from(id).unwrap(),
            })
            .collect();
        state.seed_roster(&roster);
        let batch = vec![
            AnswerRecord::new(StudentId::new(1), lesson, QuestionId::new(30))
                .finalized(NOW - 90, NOW - 30, true),
            AnswerRecord::new(StudentId::new(2), lesson, QuestionId::new(30))
                .finalized(NOW - 90, NOW - 60, false),
            AnswerRecord::new(StudentId::new(2), lesson, QuestionId::new(31)).in_progress(NOW - 45),
        ];
        state.reconcile(&batch, MergeMode::Authoritative);
        state.snapshot()
    }

    #[test]
    fn rows_follow_roster_order_with_glyphs() {
        let text = render(&snapshot());
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("Lesson 4  theme -  05:00"));
        assert!(lines[2].contains("Q1#30"));
        assert!(lines[2].contains("Q2#31"));
        assert!(lines[3].contains("Aiko"));
        assert!(lines[3].contains("○ 20%"));
        assert!(lines[4].contains("Bram"));
        assert!(lines[4].contains("× 10%"));
        assert!(lines[4].contains("✎ 15%"));
        assert!(lines[5].contains("50%"));
    }

    #[test]
    fn unanswered_slots_render_blank() {
        let snap = snapshot();
        let aiko = &snap.students[0];
        assert_eq!(cell(aiko.slot(Slot::new(2).unwrap())), "");
    }
}
