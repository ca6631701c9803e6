use ndshare_exchange::{BufferDescriptor, ErrorKind, MemoryOrder, ReturnPolicy};
use ndshare_testkit::ReleaseCounter;
use ndshare_tutorial::{
    arrays::{self, Specialization},
    matrices,
    primitives::{Data, DoubleVector, subtract_inplace},
};

#[test]
fn test_sum_of_matrices() {
    let a = matrices::colmajor(2, 3, ReturnPolicy::TakeOwnership).unwrap();
    let b = matrices::colmajor(2, 3, ReturnPolicy::Copy).unwrap();
    let total = matrices::sum(&a, &b, ReturnPolicy::TakeOwnership).unwrap();
    assert!(total.is_column_major());
    let m = total.matrix_view::<f32>(MemoryOrder::ColumnMajor).unwrap();
    assert_eq!(m.at(0, 0), 2.0);
    assert_eq!(m.at(1, 2), 12.0);

    let c = matrices::colmajor(3, 2, ReturnPolicy::TakeOwnership).unwrap();
    let err = matrices::sum(&a, &c, ReturnPolicy::Copy).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::InvalidShape { .. }));

    // Mixed orders are summed element by element, without copying the inputs.
    let r = matrices::rowmajor(2, 3, ReturnPolicy::TakeOwnership).unwrap();
    let mixed = matrices::sum(&a, &r, ReturnPolicy::TakeOwnership).unwrap();
    assert!(mixed.is_column_major());
    let m = mixed.matrix_view::<f32>(MemoryOrder::ColumnMajor).unwrap();
    // a = [[1, 3, 5], [2, 4, 6]], r = [[1, 2, 3], [4, 5, 6]]
    assert_eq!(m.to_vec(), vec![2.0, 5.0, 8.0, 6.0, 9.0, 12.0]);

    let mut wrong_type = vec![0.0f64; 6];
    let d = BufferDescriptor::describe(&mut wrong_type, &[2, 3], None, MemoryOrder::RowMajor)
        .unwrap();
    let err = matrices::sum(&a, &d, ReturnPolicy::Copy).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::TypeMismatch { .. }));
}

#[test]
fn test_modify_writes_caller_memory() {
    let mut data = vec![1.0f32; 6];
    let mut desc =
        BufferDescriptor::describe(&mut data, &[2, 3], None, MemoryOrder::ColumnMajor).unwrap();
    assert_eq!(matrices::modify(&mut desc).unwrap(), 99.0);
    drop(desc);
    assert_eq!(data[0], 99.0);
    assert!(data[1..].iter().all(|&v| v == 1.0));

    let mut row_major = vec![0.0f32; 6];
    let mut desc =
        BufferDescriptor::describe(&mut row_major, &[2, 3], None, MemoryOrder::RowMajor).unwrap();
    let err = matrices::modify(&mut desc).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::LayoutMismatch { .. }));
}

#[test]
fn test_vector_helpers() {
    let mut v = matrices::vector(5, ReturnPolicy::TakeOwnership).unwrap();
    assert_eq!(
        v.vector_view::<f32>().unwrap().to_vec(),
        vec![1.0, 2.0, 3.0, 4.0, 5.0]
    );
    assert_eq!(matrices::vector_modify(&mut v).unwrap(), Some(99.0));
    matrices::map_vector(&mut v).unwrap();
    assert_eq!(
        v.vector_view::<f32>().unwrap().to_vec(),
        vec![198.0, 4.0, 6.0, 8.0, 10.0]
    );

    let mut empty = matrices::vector(0, ReturnPolicy::TakeOwnership).unwrap();
    assert_eq!(matrices::vector_modify(&mut empty).unwrap(), None);
}

#[test]
fn test_map_vector_over_strided_column() {
    // Every other element of a row-major 3x2 matrix: its first column.
    let mut data = [1.0f32, 10.0, 2.0, 20.0, 3.0, 30.0];
    let mut column =
        BufferDescriptor::describe(&mut data, &[3], Some(&[2][..]), MemoryOrder::Any).unwrap();
    matrices::map_vector(&mut column).unwrap();
    drop(column);
    assert_eq!(data, [2.0, 10.0, 4.0, 20.0, 6.0, 30.0]);
}

#[test]
fn test_create_2d_policies_release_once() {
    let desc = arrays::create_2d(2, 3, ReturnPolicy::TakeOwnership).unwrap();
    assert_eq!(
        desc.any_layout_view::<f32>(2).unwrap().to_vec(),
        vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]
    );

    let copy = arrays::create_2d(2, 3, ReturnPolicy::Copy).unwrap();
    assert_ne!(copy.as_ptr(), desc.as_ptr());
    assert!(copy.is_owned());

    let vec3 = arrays::return_vec3(ReturnPolicy::Reference).unwrap();
    assert_eq!(vec3.shape(), &[3]);
    assert_eq!(
        vec3.vector_view::<f32>().unwrap().to_vec(),
        vec![1.0, 2.0, 3.0]
    );
}

#[test]
fn test_fill_optimized_matches_regular() {
    let mut a = vec![0.0f32; 12];
    let mut b = vec![0.0f32; 12];
    {
        let mut da = BufferDescriptor::describe(&mut a, &[3, 4], None, MemoryOrder::RowMajor).unwrap();
        let mut db = BufferDescriptor::describe(&mut b, &[3, 4], None, MemoryOrder::RowMajor).unwrap();
        arrays::fill_array_optimized(&mut da).unwrap();
        arrays::fill_array_regular(&mut db).unwrap();
    }
    assert_eq!(a, b);
    assert_eq!(a[4 + 3], 3.0);
    assert_eq!(a[2 * 4 + 3], 6.0);

    let mut c = vec![0.0f32; 12];
    let mut dc = BufferDescriptor::describe(&mut c, &[3, 4], None, MemoryOrder::ColumnMajor).unwrap();
    let err = arrays::fill_array_optimized(&mut dc).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::LayoutMismatch { .. }));
    let err = arrays::fill_array_regular(&mut dc).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::LayoutMismatch { .. }));
}

#[test]
fn test_fill_specialized_by_element_type() {
    let counter = ReleaseCounter::new();
    let (mut floats, _token) = counter.wrap(vec![0.0f32; 6], &[2, 3]).unwrap();
    let outcome = arrays::fill_array_specialized(&mut floats).unwrap();
    assert_eq!(outcome, Specialization::Float32Matrix);
    assert_eq!(outcome.to_string(), "Used specialized 2D float view");
    assert_eq!(
        floats.any_layout_view::<f32>(2).unwrap().to_vec(),
        vec![0.5, 0.5, 0.5, 0.5, 1.5, 2.5]
    );

    let (mut ints, _token) = counter.wrap(vec![0i32; 6], &[3, 2]).unwrap();
    let outcome = arrays::fill_array_specialized(&mut ints).unwrap();
    assert_eq!(outcome.to_string(), "Used specialized 2D int32 view");
    assert_eq!(
        ints.any_layout_view::<i32>(2).unwrap().to_vec(),
        vec![0, 1, 1, 2, 2, 3]
    );

    let (mut cube, _token) = counter.wrap(vec![0.0f32; 8], &[2, 2, 2]).unwrap();
    match arrays::fill_array_specialized(&mut cube).unwrap() {
        Specialization::Unsupported(key) => assert_eq!(key.ndim, 3),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_inspect_reports_layout() {
    let mut data = [0u8; 6];
    let desc = BufferDescriptor::describe(&mut data, &[2, 3], None, MemoryOrder::RowMajor).unwrap();
    let text = arrays::inspect(&desc).to_string();
    assert!(text.contains("Array dimension : 2"));
    assert!(text.contains("Array dtype: uint8"));
}

#[test]
fn test_double_vector_by_reference() {
    let mut a: DoubleVector = [1.0, 2.0, 3.0].into_iter().collect();
    {
        let mut desc = a.descriptor();
        desc.vector_view_mut::<f64>().unwrap().set(2, 30.0);
    }
    let b = DoubleVector::new(vec![1.0, 1.0, 1.0]);
    subtract_inplace(&mut a, &b).unwrap();
    assert_eq!(a.as_slice(), &[0.0, 1.0, 29.0]);

    let err = subtract_inplace(&mut a, &DoubleVector::default()).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::InvalidShape { .. }));
}

#[test]
fn test_data_serializes() {
    let data = Data::new("cube", 3);
    let json = serde_json::to_string(&data).unwrap();
    assert_eq!(json, r#"{"name":"cube","value":3}"#);
    let back: Data = serde_json::from_str(&json).unwrap();
    assert_eq!(back, data);
}
