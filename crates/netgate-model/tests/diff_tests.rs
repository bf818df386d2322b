use netgate_model::{diff, LineOp};
use proptest::prelude::*;

fn config_lines() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec("[ a-z0-9./!]{0,24}", 0..40)
}

proptest! {
    #[test]
    fn prop_self_diff_is_empty(text in "(?s).{0,400}") {
        prop_assert!(diff(&text, &text).is_empty());
    }

    #[test]
    fn prop_counts_match_line_delta(old in config_lines(), new in config_lines()) {
        let old_text: String = old.iter().map(|l| format!("{l}\n")).collect();
        let new_text: String = new.iter().map(|l| format!("{l}\n")).collect();
        let record = diff(&old_text, &new_text);

        // Every removed line leaves the old side, every added line enters the new one.
        let context = record.lines().filter(|l| l.op == LineOp::Context).count();
        prop_assert!(record.removed() + context <= old.len());
        prop_assert!(record.added() + context <= new.len());
        prop_assert_eq!(
            old.len() as isize - record.removed() as isize,
            new.len() as isize - record.added() as isize
        );
    }

    #[test]
    fn prop_line_numbers_ascend(old in config_lines(), new in config_lines()) {
        let old_text: String = old.iter().map(|l| format!("{l}\n")).collect();
        let new_text: String = new.iter().map(|l| format!("{l}\n")).collect();
        let record = diff(&old_text, &new_text);

        let olds: Vec<usize> = record.lines().filter_map(|l| l.old_line).collect();
        let news: Vec<usize> = record.lines().filter_map(|l| l.new_line).collect();
        prop_assert!(olds.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(news.windows(2).all(|w| w[0] < w[1]));
    }
}

#[test]
fn test_removed_and_added_block() {
    let current = "hostname edge\nntp server 10.0.0.1\n!\n";
    let candidate = "hostname edge\nntp server 10.0.0.2\n!\n";
    let record = diff(current, candidate);

    let ops: Vec<(LineOp, &str)> = record.lines().map(|l| (l.op, l.text.as_str())).collect();
    assert_eq!(
        ops,
        vec![
            (LineOp::Context, "hostname edge"),
            (LineOp::Remove, "ntp server 10.0.0.1"),
            (LineOp::Add, "ntp server 10.0.0.2"),
            (LineOp::Context, "!"),
        ]
    );
}

#[test]
fn test_empty_to_content() {
    let record = diff("", "auto lo\niface lo inet loopback\n");
    assert_eq!(record.added(), 2);
    assert_eq!(record.removed(), 0);
    let text = record.to_unified("a", "b");
    assert!(text.contains("@@ -0,0 +1,2 @@"));
}
