use attalos::tensor::*;

#[test]
fn test_from_vec() {
    let tensor1: Tensor<f64> = Tensor::from(vec![vec![0.0, 1.0, 2.0], vec![3.0, 4.0, 5.0]]);
    let tensor2 = Tensor::new((0..6).map(f64::from).collect(), vec![2, 3]);
    assert_eq!(tensor1, tensor2);
}

#[test]
fn test_new_with_filler() {
    let vec = Tensor::new_with_filler(vec![4], 4.0f32);
    assert_eq!(vec.shape(), &[4]);
    assert_eq!(vec.get(&[0]), Some(&4.0));
    assert_eq!(vec.get(&[4]), None);
}

#[test]
fn test_get_3x3() {
    let matrix = Tensor::new((0..9).map(f64::from).collect(), vec![3, 3]);
    let mut prev = -1.0;
    for i in 0..3 {
        for j in 0..3 {
            let &curr = matrix.get(&[i, j]).unwrap();
            assert_eq!(prev + 1.0, curr);
            prev = curr;
        }
    }
}

#[test]
fn test_add_scalar() {
    let tensor1 = Tensor::new((0..32).map(f64::from).collect(), vec![2, 16]);
    let tensor2 = Tensor::new((42..74).map(f64::from).collect(), vec![2, 16]);
    assert_eq!(tensor1.add(&Tensor::scalar(42.0)).unwrap(), tensor2);
}

#[test]
fn test_add_row_broadcast() {
    let matrix = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]);
    let bias = Tensor::new(vec![10.0, 20.0], vec![1, 2]);
    assert_eq!(
        matrix.add(&bias).unwrap(),
        Tensor::new(vec![11.0, 22.0, 13.0, 24.0], vec![2, 2])
    );
    assert!(matrix.add(&Tensor::zeros(vec![3])).is_err());
}

#[test]
fn test_matmul_2x2() {
    let matrix = Tensor::new(vec![0.0, 1.0, 2.0, 3.0], vec![2, 2]);
    let diag = Tensor::new(vec![1.0, 1.0], vec![2, 1]);
    assert_eq!(
        matrix.matmul(&diag).unwrap(),
        Tensor::new(vec![1.0, 5.0], vec![2, 1])
    );
    assert!(diag.matmul(&matrix).is_err());
}

#[test]
fn test_rows() {
    let matrix = Tensor::new((0..6).map(f64::from).collect(), vec![3, 2]);
    assert_eq!(
        matrix.rows(1, 3).unwrap(),
        Tensor::new(vec![2.0, 3.0, 4.0, 5.0], vec![2, 2])
    );
    assert_eq!(
        matrix.gather_rows(&[2, 0]).unwrap(),
        Tensor::new(vec![4.0, 5.0, 0.0, 1.0], vec![2, 2])
    );
    let parts = [matrix.rows(0, 1).unwrap(), matrix.rows(1, 3).unwrap()];
    assert_eq!(Tensor::concat_rows(&parts).unwrap(), matrix);
}

#[test]
fn test_scale_and_reduce() {
    let vec = Tensor::new_with_filler(vec![4], 1.0);
    assert_eq!(vec.scale(42.0), Tensor::new(vec![42.0; 4], vec![4]));
    assert_eq!(vec.sum(), 4.0);
    assert_eq!(Tensor::<f64>::zeros(vec![0]).mean(), 0.0);
}

#[test]
fn test_display() {
    let matrix = Tensor::new(vec![1.0, 2.0], vec![1, 2]);
    assert!(format!("{matrix}").starts_with("Tensor[1x2]"));
}
