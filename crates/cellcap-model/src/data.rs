use crate::instance::Instance;

/// The 4x5 exercise instance: nine admissible cells, with diagonals 2 and 7
/// closed
pub fn classroom_instance() -> Instance {
    Instance::new(
        vec![
            (0, 0),
            (0, 1),
            (1, 0),
            (1, 2),
            (1, 3),
            (2, 1),
            (2, 4),
            (3, 2),
            (3, 4),
        ],
        vec![9.0, 10.0, 15.0, 2.0],
        vec![7.0, 5.0, 9.0, 4.0, 8.0],
        vec![7.0, 2.0, 0.0, 8.0, 4.0, 2.0, 8.0, 0.0],
    )
}
