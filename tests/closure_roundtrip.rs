use mesh_forms::prelude::*;
use proptest::prelude::*;

/// `u`: two components per vertex, `p`: one value per cell.
fn taylor_hood_like(nx: usize, ny: usize, layout: ClosureLayout) -> (Mesh, Section) {
    let mesh = rectangle_mesh(nx, ny, [0.0, 0.0], [1.0, 1.0], CellType::Quadrilateral).unwrap();
    let mut cat = FieldCatalog::new();
    cat.add_field("u", 2, 1).unwrap();
    cat.add_field("p", 1, 0).unwrap();
    let section = Section::from_fields(&mesh, cat.fields(), layout).unwrap();
    (mesh, section)
}

fn layout() -> impl Strategy<Value = ClosureLayout> {
    prop_oneof![Just(ClosureLayout::FieldMajor), Just(ClosureLayout::PointMajor)]
}

proptest! {
    #[test]
    fn insert_then_read_back(
        nx in 1usize..4,
        ny in 1usize..4,
        layout in layout(),
        vals in proptest::collection::vec(-10.0f64..10.0, 9),
    ) {
        let (mesh, section) = taylor_hood_like(nx, ny, layout);
        let acc = ClosureAccessor::new(mesh.sieve(), &section);
        for cell in mesh.cells() {
            prop_assert_eq!(acc.closure_size(cell), 9);
            let mut v = DenseVector::new(section.len());
            acc.set_closure(&mut v, cell, &vals, InsertMode::Insert).unwrap();
            prop_assert_eq!(acc.get_closure(&v, cell).unwrap(), vals.clone());

            acc.set_closure(&mut v, cell, &vals, InsertMode::Add).unwrap();
            let doubled: Vec<f64> = vals.iter().map(|x| 2.0 * x).collect();
            prop_assert_eq!(acc.get_closure(&v, cell).unwrap(), doubled);
        }
    }

    #[test]
    fn closure_map_partitions_the_buffer(
        nx in 1usize..4,
        ny in 1usize..4,
        layout in layout(),
    ) {
        let (mesh, section) = taylor_hood_like(nx, ny, layout);
        let acc = ClosureAccessor::new(mesh.sieve(), &section);
        for cell in mesh.cells() {
            let map = acc.closure_map(cell);
            prop_assert_eq!(map.field(0).len(), 8);
            prop_assert_eq!(map.field(1).len(), 1);
            let mut all: Vec<usize> = map.field(0).iter().chain(map.field(1)).copied().collect();
            all.sort_unstable();
            prop_assert_eq!(all, (0..9).collect::<Vec<_>>());
        }
    }
}

#[test]
fn field_major_groups_by_field() {
    let (mesh, section) = taylor_hood_like(1, 1, ClosureLayout::FieldMajor);
    let acc = ClosureAccessor::new(mesh.sieve(), &section);
    let cell = mesh.cells()[0];
    let map = acc.closure_map(cell);
    assert_eq!(map.field(0), &[0, 1, 2, 3, 4, 5, 6, 7]);
    assert_eq!(map.field(1), &[8]);
}

#[test]
fn point_major_puts_the_cell_first() {
    let (mesh, section) = taylor_hood_like(1, 1, ClosureLayout::PointMajor);
    let acc = ClosureAccessor::new(mesh.sieve(), &section);
    let cell = mesh.cells()[0];
    let map = acc.closure_map(cell);
    assert_eq!(map.field(1), &[0]);
    assert_eq!(map.field(0), &[1, 2, 3, 4, 5, 6, 7, 8]);
}

#[test]
fn shared_vertices_accumulate_under_add() {
    let (mesh, section) = taylor_hood_like(2, 1, ClosureLayout::FieldMajor);
    let acc = ClosureAccessor::new(mesh.sieve(), &section);
    let mut v = DenseVector::new(section.len());
    for cell in mesh.cells() {
        acc.set_closure(&mut v, cell, &[1.0; 9], InsertMode::Add).unwrap();
    }
    // two cells share two vertices (four u dofs)
    let twos = v.as_slice().iter().filter(|x| **x == 2.0).count();
    assert_eq!(twos, 4);
    assert_eq!(v.as_slice().iter().sum::<f64>(), 18.0);
}

#[test]
fn wrong_buffer_length_is_rejected() {
    let (mesh, section) = taylor_hood_like(1, 1, ClosureLayout::FieldMajor);
    let acc = ClosureAccessor::new(mesh.sieve(), &section);
    let cell = mesh.cells()[0];
    let mut v = DenseVector::new(section.len());
    assert_eq!(
        acc.set_closure(&mut v, cell, &[0.0; 4], InsertMode::Insert),
        Err(MeshFormsError::ClosureSizeMismatch {
            point: cell,
            expected: 9,
            found: 4
        })
    );
}
