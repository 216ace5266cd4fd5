use recoll_launcher::data_store::{load_data, save_data, DataError};

#[test]
fn saved_value_loads_back() {
    let dir = tempfile::tempdir().unwrap();

    save_data(dir.path(), "last_query", "whale").unwrap();

    assert_eq!(load_data(dir.path(), "last_query").unwrap(), "whale");
}

#[test]
fn only_the_first_token_is_returned() {
    let dir = tempfile::tempdir().unwrap();

    save_data(dir.path(), "token", "  abc def\nsecond line\n").unwrap();

    assert_eq!(load_data(dir.path(), "token").unwrap(), "abc");
}

#[test]
fn empty_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    save_data(dir.path(), "blank", "\n").unwrap();

    assert!(matches!(load_data(dir.path(), "blank"), Err(DataError::Empty(_))));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(load_data(dir.path(), "nothing"), Err(DataError::Io { .. })));
}

#[test]
fn nested_names_are_refused() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        save_data(dir.path(), "a/b", "x"),
        Err(DataError::InvalidName(_))
    ));
}
