use homework_hint_bot::callback::Callback;
use homework_hint_bot::views::clamp_page;
use proptest::prelude::*;

fn any_callback() -> impl Strategy<Value = Callback> {
    let id = -1_000_000i64..1_000_000_000;
    prop_oneof![
        Just(Callback::MainMenu),
        Just(Callback::HomeworkList),
        Just(Callback::AdminMenu),
        Just(Callback::AdminSearch),
        Just(Callback::AdminCancel),
        Just(Callback::AdminHwAdd),
        id.clone().prop_map(|kim| Callback::Homework { kim }),
        id.clone().prop_map(|kim| Callback::Hints { kim }),
        (id.clone(), id.clone()).prop_map(|(kim, task_id)| Callback::Task { kim, task_id }),
        (id.clone(), id.clone())
            .prop_map(|(kim, task_id)| Callback::HintStart { kim, task_id }),
        (id.clone(), id.clone())
            .prop_map(|(kim, task_id)| Callback::SubmitCode { kim, task_id }),
        (id.clone(), id.clone(), any::<bool>()).prop_map(|(kim, task_id, helpful)| {
            Callback::Feedback {
                kim,
                task_id,
                helpful,
            }
        }),
        id.clone().prop_map(Callback::AdminListPage),
        id.clone().prop_map(Callback::AdminViewSolution),
        id.clone().prop_map(Callback::AdminDelete),
        id.clone().prop_map(Callback::AdminConfirmDelete),
        id.clone().prop_map(Callback::AdminHwView),
        id.clone().prop_map(Callback::AdminHwToggle),
        id.clone().prop_map(Callback::AdminHwDelete),
        id.prop_map(Callback::AdminHwConfirmDelete),
    ]
}

proptest! {
    /// Every encoded token parses back and fits Telegram's 64-byte limit.
    #[test]
    fn tokens_round_trip(callback in any_callback()) {
        let token = callback.to_string();
        prop_assert!(token.len() <= 64, "token too long: {}", token);
        prop_assert_eq!(token.parse::<Callback>(), Ok(callback));
    }

    /// Arbitrary text never panics the parser.
    #[test]
    fn parser_does_not_crash(s in "\\PC*") {
        let _ = s.parse::<Callback>();
    }

    /// The clamped page is always a valid, non-empty slice of the list.
    #[test]
    fn clamped_page_is_in_range(
        requested in any::<i64>(),
        len in 1usize..500,
        page_size in 1usize..20,
    ) {
        let window = clamp_page(requested, len, page_size).expect("non-empty list");
        prop_assert!(window.index < window.pages);
        prop_assert!(window.start < window.end);
        prop_assert!(window.end <= len);
        prop_assert!(window.end - window.start <= page_size);
        if requested < 0 {
            prop_assert_eq!(window.index, 0);
        }
        if usize::try_from(requested).is_ok_and(|r| r >= window.pages) {
            prop_assert_eq!(window.index, window.pages - 1);
        }
    }

    /// Empty lists never yield a page.
    #[test]
    fn empty_list_has_no_page(requested in any::<i64>(), page_size in 1usize..20) {
        prop_assert!(clamp_page(requested, 0, page_size).is_none());
    }
}
