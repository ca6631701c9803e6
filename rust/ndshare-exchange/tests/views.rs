use ndshare_exchange::{
    BufferDescriptor, DType, DispatchTable, Dispatched, ErrorKind, MemoryOrder, ViewSpec,
};
use ndshare_testkit::{random_layout, sequence};

#[test]
fn test_any_layout_view_reads_true_values() {
    let mut rng = fastrand::Rng::with_seed(2718281828);
    for _ in 0..200 {
        let layout = random_layout(&mut rng, 4, 6);
        let mut memory = sequence::<i64>(layout.buffer_len, 0);
        let expected = layout
            .indices()
            .iter()
            .map(|index| memory[layout.offset(index)])
            .collect::<Vec<_>>();

        let desc = BufferDescriptor::describe(
            &mut memory,
            &layout.shape,
            Some(layout.strides.as_slice()),
            MemoryOrder::Any,
        )
        .unwrap();
        let view = desc.any_layout_view::<i64>(layout.shape.len()).unwrap();
        assert_eq!(view.to_vec(), expected, "{layout:?}");
        for index in layout.indices() {
            assert_eq!(view.at(&index), layout.offset(&index) as i64);
        }
    }
}

#[test]
fn test_row_major_accepts_row_major_only() {
    let mut data = sequence::<f32>(12, 1);
    let desc = BufferDescriptor::describe(&mut data, &[3, 4], Some(&[4, 1]), MemoryOrder::Any)
        .unwrap();
    assert!(
        desc.typed_view::<f32>(&ViewSpec::matrix(MemoryOrder::RowMajor))
            .is_ok()
    );
    let err = desc
        .typed_view::<f32>(&ViewSpec::matrix(MemoryOrder::ColumnMajor))
        .unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::LayoutMismatch { .. }));
}

#[test]
fn test_column_major_accepts_column_major_only() {
    let mut data = sequence::<f32>(12, 1);
    let desc = BufferDescriptor::describe(&mut data, &[3, 4], Some(&[1, 3]), MemoryOrder::Any)
        .unwrap();
    assert!(desc.matrix_view::<f32>(MemoryOrder::ColumnMajor).is_ok());
    let err = desc.matrix_view::<f32>(MemoryOrder::RowMajor).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::LayoutMismatch { .. }));
}

#[test]
fn test_rank_requirement_is_a_shape_error() {
    let mut data = sequence::<f32>(24, 1);
    for shape in [&[24][..], &[2, 3, 4][..]] {
        let desc = BufferDescriptor::describe(&mut data, shape, None, MemoryOrder::RowMajor)
            .unwrap();
        let err = desc.matrix_view::<f32>(MemoryOrder::Any).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidShape { .. }));
    }
}

#[test]
fn test_element_2_3_of_sequential_matrix() {
    let mut data = sequence::<f32>(12, 1);
    let desc =
        BufferDescriptor::describe(&mut data, &[3, 4], Some(&[4, 1]), MemoryOrder::RowMajor)
            .unwrap();
    let view = desc
        .typed_view::<f32>(&ViewSpec::matrix(MemoryOrder::RowMajor))
        .unwrap();
    assert_eq!(view.at(&[2, 3]), 12.0);
}

#[test]
fn test_dispatch_selects_int32_arm() {
    let mut data = [0i32; 12];
    let mut desc =
        BufferDescriptor::describe(&mut data, &[3, 4], None, MemoryOrder::RowMajor).unwrap();
    let mut table = DispatchTable::new()
        .on::<f32, _>(2, |mut view| {
            view.fill_with(|idx| (idx[0] * idx[1]) as f32 + 0.5);
            DType::Float32
        })
        .on::<i32, _>(2, |mut view| {
            view.fill_with(|idx| (idx[0] + idx[1]) as i32);
            DType::Int32
        });
    let outcome = table.dispatch(&mut desc).unwrap();
    assert!(matches!(
        outcome,
        Dispatched::Matched {
            value: DType::Int32,
            ..
        }
    ));
    drop(desc);
    for i in 0..3 {
        for j in 0..4 {
            assert_eq!(data[i * 4 + j], (i + j) as i32);
        }
    }
}

#[test]
fn test_any_layout_view_is_idempotent() {
    let mut data = sequence::<u16>(20, 3);
    let desc = BufferDescriptor::describe(&mut data, &[4, 3], Some(&[1, 5]), MemoryOrder::Any)
        .unwrap();
    let first = desc.any_layout_view::<u16>(2).unwrap().to_vec();
    let second = desc.any_layout_view::<u16>(2).unwrap().to_vec();
    assert_eq!(first, second);
    drop(desc);
    assert_eq!(data, sequence::<u16>(20, 3));
}
