use acrocmd_core::window::WindowedList;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Up,
    Down,
    Resize(usize),
    Click(usize),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => Just(Op::Down),
        3 => Just(Op::Up),
        1 => (0usize..60).prop_map(Op::Resize),
        1 => (0usize..60).prop_map(Op::Click),
    ]
}

fn offset_in_bounds(list: &WindowedList, item_count: usize) -> bool {
    list.offset() <= item_count.saturating_sub(list.visible_height())
}

proptest! {
    /// Property: offset stays within [0, max(0, N - H)] under any key sequence
    #[test]
    fn prop_offset_within_bounds(
        item_count in 0usize..300,
        height in 0usize..60,
        ops in prop::collection::vec(arb_op(), 0..400),
    ) {
        let mut list = WindowedList::new(height);
        for op in ops {
            match op {
                Op::Up => list.up(),
                Op::Down => list.down(item_count),
                Op::Resize(h) => list.resize(h, item_count),
                Op::Click(row) => list.select_row(row, item_count),
            }
            prop_assert!(offset_in_bounds(&list, item_count));
            if item_count > 0 {
                prop_assert!(list.selected_index() < item_count);
            }
        }
    }

    /// Property: each down press advances the selection by one until the end
    #[test]
    fn prop_down_advances_by_one(item_count in 1usize..300, height in 1usize..60) {
        let mut list = WindowedList::new(height);
        let mut previous = list.selected_index();
        prop_assert_eq!(previous, 0);

        for _ in 0..item_count + 5 {
            list.down(item_count);
            let current = list.selected_index();
            if previous < item_count - 1 {
                prop_assert_eq!(current, previous + 1);
            } else {
                prop_assert_eq!(current, item_count - 1);
            }
            previous = current;
        }
    }

    /// Property: each up press walks the selection back by one until the top
    #[test]
    fn prop_up_retreats_by_one(item_count in 1usize..300, height in 1usize..60) {
        let mut list = WindowedList::new(height);
        for _ in 0..item_count {
            list.down(item_count);
        }

        let mut previous = list.selected_index();
        for _ in 0..item_count + 5 {
            list.up();
            let current = list.selected_index();
            prop_assert_eq!(current, previous.saturating_sub(1));
            previous = current;
        }
    }

    /// Property: growing the viewport never leaves it hanging past the end
    #[test]
    fn prop_resize_never_overruns(
        item_count in 0usize..300,
        height in 0usize..60,
        grow in 0usize..60,
        downs in 0usize..400,
    ) {
        let mut list = WindowedList::new(height);
        for _ in 0..downs {
            list.down(item_count);
        }

        let bigger = height + grow;
        list.resize(bigger, item_count);
        if item_count >= bigger {
            prop_assert!(list.offset() + bigger <= item_count);
        } else {
            prop_assert_eq!(list.offset(), 0);
        }
    }

    /// Property: the render window holds at most visible_height + 1 items
    #[test]
    fn prop_render_window_size(
        item_count in 0usize..300,
        height in 0usize..60,
        downs in 0usize..400,
    ) {
        let items: Vec<usize> = (0..item_count).collect();
        let mut list = WindowedList::new(height);
        for _ in 0..downs {
            list.down(item_count);
        }

        let rendered = list.render(&items, |n| *n);
        prop_assert!(rendered.len() <= height + 1);
        if let Some(first) = rendered.first() {
            prop_assert_eq!(*first, list.offset());
        }
    }
}
