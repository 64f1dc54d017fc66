use {
    async_std::{stream::StreamExt, task},
    r3vi_collections::{
        buffer::{singleton::SingletonBuffer, vec::VecBuffer},
        view::{
            list::{ListDiff, ListView},
            OuterViewPort, ViewPort,
        },
        DuplicatePolicy, ProjectionConfig, ViewError,
    },
    std::{
        any::Any,
        sync::{Arc, Mutex},
    },
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Log every diff the port emits. The log is fed as long as
/// the returned handle lives.
fn record<T>(
    port: &OuterViewPort<dyn ListView<T>>,
) -> (Arc<Mutex<Vec<ListDiff<T>>>>, Arc<dyn Any + Send + Sync>)
where
    T: Clone + Send + Sync + 'static,
{
    let log = Arc::new(Mutex::new(Vec::new()));
    let l = log.clone();
    let obs: Arc<dyn Any + Send + Sync> =
        port.add_notify_fn(move |msg: &ListDiff<T>| l.lock().unwrap().push(msg.clone()));
    (log, obs)
}

#[test]
fn even_numbers() {
    init_tracing();
    let mut source = VecBuffer::with_data(vec![1, 2, 3, 4, 5]);
    let evens = source.get_port().filter_list(|x| x % 2 == 0);
    let (log, _keep) = record(&evens.port());

    assert_eq!(evens.to_vec(), vec![2, 4]);

    source.insert(5, 6).unwrap();
    source.remove(1).unwrap();
    assert_eq!(evens.to_vec(), vec![4, 6]);

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            ListDiff::Insert {
                idx: 2,
                items: vec![6]
            },
            ListDiff::Remove {
                idx: 0,
                items: vec![2]
            },
        ]
    );
}

#[test]
fn upper_case_conversion() {
    init_tracing();
    let mut source = VecBuffer::with_data(vec!["a".to_string(), "b".to_string()]);
    let upper = source.get_port().map_list(|s: &String| s.to_uppercase());
    let (log, _keep) = record(&upper.port());

    assert_eq!(upper.to_vec(), vec!["A", "B"]);

    source.replace(0, "c".to_string()).unwrap();
    assert_eq!(upper.to_vec(), vec!["C", "B"]);
    assert!(!upper.contains_source(&"a".to_string()));
    assert!(upper.contains_source(&"c".to_string()));

    assert_eq!(
        *log.lock().unwrap(),
        vec![ListDiff::Replace {
            idx: 0,
            old: "A".to_string(),
            new: "C".to_string()
        }]
    );
}

#[test]
fn sorted_insert_at_front() {
    init_tracing();
    let mut source = VecBuffer::with_data(vec![3, 1, 2]);
    let sorted = source.get_port().sort_filter_list(|_| true, |x| *x);

    assert_eq!(sorted.to_vec(), vec![1, 2, 3]);

    source.insert(0, 0).unwrap();
    assert_eq!(sorted.to_vec(), vec![0, 1, 2, 3]);
}

#[test]
fn flipped_item_enters_without_structural_change() {
    init_tracing();
    let a = SingletonBuffer::new(false);
    let b = SingletonBuffer::new(true);
    let source = VecBuffer::with_data(vec![a.clone(), b.clone()]);
    let source_log = Arc::new(Mutex::new(0));
    let s = source_log.clone();
    let _source_obs = source.get_port().add_notify_fn(move |_| *s.lock().unwrap() += 1);

    let passing = source.get_port().filter_list(|x| x.get());
    let (log, _keep) = record(&passing.port());

    *a.get_mut() = true;

    assert_eq!(passing.to_vec(), vec![a.clone(), b.clone()]);
    assert_eq!(*source_log.lock().unwrap(), 0);
    assert_eq!(
        *log.lock().unwrap(),
        vec![ListDiff::Insert {
            idx: 0,
            items: vec![a.clone()]
        }]
    );
}

#[test]
fn filter_over_map_stays_consistent() {
    init_tracing();
    let mut source = VecBuffer::with_data(vec![1, 2, 3]);
    let squares = source.get_port().map_list(|x: &i32| x * x);
    let big = squares.port().filter_list(|x| *x > 3);
    let sorted = squares.port().sort_filter_list(|x| x % 2 == 1, |x| -*x);

    assert_eq!(big.to_vec(), vec![4, 9]);
    assert_eq!(sorted.to_vec(), vec![9, 1]);

    source.push(5).unwrap();
    source.remove(0).unwrap();
    source.move_item(2, 0).unwrap();
    source.replace(1, 7).unwrap();

    assert_eq!(source.to_vec(), vec![5, 7, 3]);
    assert_eq!(squares.to_vec(), vec![25, 49, 9]);
    assert_eq!(big.to_vec(), vec![25, 49, 9]);
    assert_eq!(sorted.to_vec(), vec![49, 25, 9]);
}

#[test]
fn out_of_range_remove_faults_the_view() {
    init_tracing();
    let port = ViewPort::<dyn ListView<u32>>::new();
    let _source = VecBuffer::with_data_port(vec![1, 2], port.inner());
    let view = port.outer().filter_list(|_| true);
    let mapped = port.outer().map_list(|x: &u32| x + 1);

    port.inner().notify(&ListDiff::Remove {
        idx: 5,
        items: vec![1],
    });

    assert!(matches!(view.fault(), Some(ViewError::InvalidEvent { .. })));
    assert!(matches!(mapped.fault(), Some(ViewError::InvalidEvent { .. })));

    // later events are ignored
    port.inner().notify(&ListDiff::Reset);
    assert_eq!(view.to_vec(), vec![1, 2]);
    assert_eq!(mapped.to_vec(), vec![2, 3]);
}

#[test]
fn mismatched_item_faults_the_view() {
    let port = ViewPort::<dyn ListView<u32>>::new();
    let _source = VecBuffer::with_data_port(vec![1, 2], port.inner());
    let view = port.outer().filter_list(|_| true);

    let err = view
        .apply(&ListDiff::Replace {
            idx: 0,
            old: 7,
            new: 8,
        })
        .unwrap_err();

    assert!(matches!(err, ViewError::InvalidEvent { action: "replace", .. }));
    assert_eq!(view.fault(), Some(err.clone()));
    assert_eq!(view.apply(&ListDiff::Reset), Err(err));
}

#[test]
fn dropping_the_handle_detaches() {
    let mut source = VecBuffer::with_data(vec![1, 2, 3]);
    let a = SingletonBuffer::new(1);
    let items = VecBuffer::with_data(vec![a.clone()]);

    {
        let _evens = source.get_port().filter_list(|x| x % 2 == 0);
        let _mapped = source.get_port().map_list(|x: &i32| *x);
        let _watching = items.get_port().filter_list(|x| x.get() > 0);
        assert_eq!(source.observer_count(), 2);
        assert_eq!(a.port.observer_count(), 1);
    }

    assert_eq!(source.observer_count(), 0);
    assert_eq!(a.port.observer_count(), 0);
    source.push(4).unwrap();
}

#[test]
fn configured_reject_policy() {
    let config = ProjectionConfig::from_json(r#"{ "name": "ids", "duplicates": "reject" }"#).unwrap();
    assert_eq!(config.duplicates, DuplicatePolicy::Reject);

    let source = VecBuffer::with_data(vec![1, 1]);
    let mapped = source.get_port().map_list_with_config(|x: &i32| *x, config);

    assert_eq!(mapped.fault(), Some(ViewError::DuplicateIdentity));
}

#[test]
fn subscribed_stream_yields_diffs() {
    let mut source = VecBuffer::with_data(vec![1, 2, 3]);
    let evens = source.get_port().filter_list(|x| x % 2 == 0);
    let mut rx = evens.port().subscribe();

    source.push(4).unwrap();
    source.push(5).unwrap();
    source.remove(1).unwrap();

    let diffs = task::block_on(async {
        let mut diffs = Vec::new();
        for _ in 0..2 {
            if let Some(diff) = rx.next().await {
                diffs.push(diff);
            }
        }
        diffs
    });

    assert_eq!(
        diffs,
        vec![
            ListDiff::Insert {
                idx: 1,
                items: vec![4]
            },
            ListDiff::Remove {
                idx: 0,
                items: vec![2]
            },
        ]
    );
}
